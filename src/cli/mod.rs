pub mod commands;
pub mod context;
pub mod logging;
pub mod output;

use clap::{Parser, Subcommand};

/// Describe ECS Fargate services per environment and region.
#[derive(Parser, Debug)]
#[command(name = "ecsforge", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Target environment (defaults to settings.default_environment)
    #[arg(long, global = true, env = "ECSFORGE_ENV")]
    pub env: Option<String>,

    /// Stack type: standard or explicit-resource
    #[arg(long = "stack-type", global = true, default_value = "standard")]
    pub stack_type: String,

    /// Only act on this region of the environment
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Path to an environment table (default: ./ecsforge.toml, else built-in)
    #[arg(long, global = true, env = "ECSFORGE_CONFIG")]
    pub config: Option<String>,

    /// Directory for synthesized templates
    #[arg(long, global = true, default_value = "ecsforge.out")]
    pub out: String,

    /// Path to the aws binary
    #[arg(long = "aws-cli", global = true, env = "ECSFORGE_AWS_CLI", default_value = "aws")]
    pub aws_cli: String,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode: only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write templates and manifest for every region of the environment
    Synth,

    /// Compare with the previously synthesized templates
    Diff {
        /// Exit with an error when differences exist
        #[arg(long)]
        fail: bool,
    },

    /// Synthesize, then deploy every region through the aws cli
    Deploy {
        /// Print the engine commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete the stack of every region
    Destroy {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
        /// Print the engine commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate every environment in the table
    Check,

    /// List environments, regions and capacity
    Environments,
}
