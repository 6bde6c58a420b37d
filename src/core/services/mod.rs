pub mod config_check;
pub mod env_resolver;
pub mod listener_rules;
pub mod stack_assembler;
pub mod template_diff;
