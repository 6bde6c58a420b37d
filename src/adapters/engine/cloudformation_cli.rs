use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::errors::{ForgeError, Result};
use crate::core::models::deployment_unit::DeploymentUnit;
use crate::core::traits::engine::ProvisioningEngine;

/// Provisioning engine that shells out to the `aws` CLI.
///
/// Requires the AWS CLI to be installed and credentials to be available
/// the way the CLI normally finds them. Nothing is retried: the first
/// non-zero exit is returned as a collaborator error.
pub struct CloudFormationCli {
    /// Path to the aws binary (defaults to "aws").
    aws_path: PathBuf,
    /// Set for local emulation; passed as `--endpoint-url`.
    endpoint_url: Option<String>,
    /// Print commands instead of running them.
    dry_run: bool,
}

impl CloudFormationCli {
    pub fn new() -> Self {
        Self {
            aws_path: PathBuf::from("aws"),
            endpoint_url: None,
            dry_run: false,
        }
    }

    pub fn with_path(aws_path: PathBuf) -> Self {
        Self {
            aws_path,
            ..Self::new()
        }
    }

    pub fn with_endpoint(mut self, endpoint_url: Option<String>) -> Self {
        self.endpoint_url = endpoint_url;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Arguments for `aws cloudformation deploy`.
    pub fn deploy_args(&self, unit: &DeploymentUnit, template_path: &Path) -> Vec<String> {
        let mut args = vec![
            "cloudformation".to_string(),
            "deploy".to_string(),
            "--template-file".to_string(),
            template_path.display().to_string(),
            "--stack-name".to_string(),
            unit.stack_name.clone(),
            "--region".to_string(),
            unit.region.clone(),
            "--capabilities".to_string(),
            "CAPABILITY_IAM".to_string(),
            "--no-fail-on-empty-changeset".to_string(),
        ];
        self.push_endpoint(&mut args);
        args
    }

    /// Argument lists for `delete-stack` followed by
    /// `wait stack-delete-complete`.
    pub fn destroy_args(&self, unit: &DeploymentUnit) -> [Vec<String>; 2] {
        [
            self.stack_args(&["cloudformation", "delete-stack"], unit),
            self.stack_args(&["cloudformation", "wait", "stack-delete-complete"], unit),
        ]
    }

    fn stack_args(&self, head: &[&str], unit: &DeploymentUnit) -> Vec<String> {
        let mut args: Vec<String> = head.iter().map(|s| s.to_string()).collect();
        args.extend([
            "--stack-name".to_string(),
            unit.stack_name.clone(),
            "--region".to_string(),
            unit.region.clone(),
        ]);
        self.push_endpoint(&mut args);
        args
    }

    fn push_endpoint(&self, args: &mut Vec<String>) {
        if let Some(endpoint) = &self.endpoint_url {
            args.push("--endpoint-url".to_string());
            args.push(endpoint.clone());
        }
    }

    /// The command line as it would be typed in a shell.
    pub fn render(&self, args: &[String]) -> String {
        let mut line = self.aws_path.display().to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run the aws binary and fail on a non-zero exit.
    fn run_aws(&self, args: &[String]) -> Result<()> {
        if self.dry_run {
            println!("  {}", self.render(args));
            return Ok(());
        }

        tracing::debug!(command = %self.render(args), "running aws cli");

        let output = Command::new(&self.aws_path)
            .args(args)
            .output()
            .map_err(|e| ForgeError::Collaborator {
                tool: self.aws_path.display().to_string(),
                detail: format!("could not start: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(ForgeError::Collaborator {
                tool: self.aws_path.display().to_string(),
                detail: format!("exit {code}: {}", stderr.trim()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            tracing::info!(target: "ecsforge::engine", "{}", line.trim());
        }

        Ok(())
    }
}

impl Default for CloudFormationCli {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvisioningEngine for CloudFormationCli {
    fn deploy(&self, unit: &DeploymentUnit, template_path: &Path) -> Result<()> {
        self.run_aws(&self.deploy_args(unit, template_path))
    }

    fn destroy(&self, unit: &DeploymentUnit) -> Result<()> {
        let [delete, wait] = self.destroy_args(unit);
        self.run_aws(&delete)?;
        self.run_aws(&wait)
    }

    fn name(&self) -> &str {
        "cloudformation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::environment::StackMode;
    use crate::core::models::template::Template;
    use std::collections::BTreeMap;

    fn unit() -> DeploymentUnit {
        DeploymentUnit {
            stack_name: "orders-api-dev-us-east-1".into(),
            environment: "dev".into(),
            region: "us-east-1".into(),
            mode: StackMode::Standard,
            template: Template {
                description: "t".into(),
                resources: Vec::new(),
                outputs: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn deploy_args_name_stack_region_and_capabilities() {
        let engine = CloudFormationCli::new();
        let args = engine.deploy_args(&unit(), Path::new("out/orders-api-dev-us-east-1.template.json"));

        assert_eq!(
            args,
            vec![
                "cloudformation",
                "deploy",
                "--template-file",
                "out/orders-api-dev-us-east-1.template.json",
                "--stack-name",
                "orders-api-dev-us-east-1",
                "--region",
                "us-east-1",
                "--capabilities",
                "CAPABILITY_IAM",
                "--no-fail-on-empty-changeset",
            ]
        );
    }

    #[test]
    fn endpoint_added_for_local_emulation() {
        let engine = CloudFormationCli::new().with_endpoint(Some("http://localhost:4566".into()));

        let args = engine.deploy_args(&unit(), Path::new("t.json"));
        assert_eq!(&args[args.len() - 2..], ["--endpoint-url", "http://localhost:4566"]);

        for args in engine.destroy_args(&unit()) {
            assert!(args.contains(&"--endpoint-url".to_string()));
        }
    }

    #[test]
    fn destroy_deletes_then_waits() {
        let [delete, wait] = CloudFormationCli::new().destroy_args(&unit());

        assert_eq!(&delete[..2], ["cloudformation", "delete-stack"]);
        assert_eq!(&wait[..3], ["cloudformation", "wait", "stack-delete-complete"]);
        assert!(wait.contains(&"orders-api-dev-us-east-1".to_string()));
    }

    #[test]
    fn dry_run_never_spawns() {
        let engine = CloudFormationCli::with_path(PathBuf::from("/nonexistent/aws")).dry_run(true);

        assert!(engine.deploy(&unit(), Path::new("t.json")).is_ok());
        assert!(engine.destroy(&unit()).is_ok());
    }

    #[test]
    fn missing_binary_is_collaborator_error() {
        let engine = CloudFormationCli::with_path(PathBuf::from("/nonexistent/aws"));

        let err = engine.deploy(&unit(), Path::new("t.json")).unwrap_err();

        assert_eq!(err.kind(), crate::core::errors::ErrorKind::Collaborator);
        assert!(err.to_string().contains("/nonexistent/aws"));
    }

    #[test]
    fn render_joins_binary_and_args() {
        let engine = CloudFormationCli::new();
        let line = engine.render(&["cloudformation".into(), "deploy".into()]);

        assert_eq!(line, "aws cloudformation deploy");
    }
}
