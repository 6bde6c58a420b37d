pub mod template_writer;
