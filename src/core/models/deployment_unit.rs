use super::environment::StackMode;
use super::template::Template;

/// One self-contained set of resources for an (environment, region) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentUnit {
    pub stack_name: String,
    pub environment: String,
    pub region: String,
    pub mode: StackMode,
    pub template: Template,
}

impl DeploymentUnit {
    /// `<app>-<environment>-<region>`, the CloudFormation stack name.
    pub fn stack_name_for(app_name: &str, environment: &str, region: &str) -> String {
        format!("{app_name}-{environment}-{region}")
    }

    /// File name of the synthesized template inside the output directory.
    pub fn template_file_name(&self) -> String {
        format!("{}.template.json", self.stack_name)
    }
}
