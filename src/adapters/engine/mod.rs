pub mod cloudformation_cli;
