use std::path::PathBuf;

use crate::adapters::engine::cloudformation_cli::CloudFormationCli;
use crate::adapters::synth::template_writer::TemplateWriter;
use crate::cli::Cli;
use crate::config::app_config::EnvironmentTable;
use crate::core::errors::Result;
use crate::core::models::deployment_unit::DeploymentUnit;
use crate::core::models::environment::ResolvedEnvironment;
use crate::core::services::env_resolver::EnvResolver;
use crate::core::services::stack_assembler::StackAssembler;

/// Endpoint of the local AWS emulator when `ECSFORGE_LOCAL_ENDPOINT` is unset.
pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:4566";

/// Environment that is deployed against the local emulator.
pub const LOCAL_ENVIRONMENT: &str = "local";

/// Everything a command needs, built once from the command line.
#[derive(Debug, Clone)]
pub struct Context {
    pub table: EnvironmentTable,
    pub environment: String,
    pub stack_type: String,
    pub region: Option<String>,
    pub out_dir: PathBuf,
    pub aws_cli: PathBuf,
    /// From `CDK_DEFAULT_ACCOUNT`.
    pub account: Option<String>,
    pub local_endpoint: String,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let table = EnvironmentTable::discover(cli.config.as_deref())?;
        tracing::debug!(source = %table.source, "loaded environment table");

        let environment = cli
            .env
            .clone()
            .unwrap_or_else(|| table.settings.default_environment.clone());

        Ok(Self {
            environment,
            stack_type: cli.stack_type.clone(),
            region: cli.region.clone(),
            out_dir: PathBuf::from(&cli.out),
            aws_cli: PathBuf::from(&cli.aws_cli),
            account: non_empty_var("CDK_DEFAULT_ACCOUNT"),
            local_endpoint: non_empty_var("ECSFORGE_LOCAL_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_LOCAL_ENDPOINT.to_string()),
            table,
        })
    }

    pub fn resolve(&self) -> Result<ResolvedEnvironment> {
        EnvResolver.resolve_in(
            &self.environment,
            &self.stack_type,
            self.region.as_deref(),
            &self.table,
        )
    }

    /// Resolve and assemble one unit per selected region.
    pub fn assemble(&self) -> Result<Vec<DeploymentUnit>> {
        let resolved = self.resolve()?;
        StackAssembler.assemble(&resolved)
    }

    pub fn writer(&self) -> TemplateWriter {
        TemplateWriter::new(&self.out_dir)
    }

    pub fn engine(&self, dry_run: bool) -> CloudFormationCli {
        let endpoint = (self.environment == LOCAL_ENVIRONMENT).then(|| self.local_endpoint.clone());
        CloudFormationCli::with_path(self.aws_cli.clone())
            .with_endpoint(endpoint)
            .dry_run(dry_run)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
