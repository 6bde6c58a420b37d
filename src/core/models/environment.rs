use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::routing::{DeploymentStrategy, RoutingPolicy};
use crate::core::errors::ForgeError;

/// How a deployment unit is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StackMode {
    /// Load-balanced service pattern: one default forward, rolling updates.
    Standard,
    /// Every resource declared explicitly, honouring the environment's
    /// routing policy and deployment strategy.
    ExplicitResource,
}

impl StackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::ExplicitResource => "explicit-resource",
        }
    }
}

impl fmt::Display for StackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StackMode {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "explicit-resource" => Ok(Self::ExplicitResource),
            other => Err(ForgeError::UnsupportedMode {
                mode: other.to_string(),
            }),
        }
    }
}

/// Network placement and regional identity resources for one region.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RegionConfig {
    pub vpc_id: String,
    /// Ordered; the load balancer and service use them as listed.
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
    /// ACM certificate; must live in the same region.
    pub certificate_arn: String,
    pub hosted_zone_id: String,
}

/// One application+environment pair and everything needed to build
/// its deployment units.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EnvironmentConfig {
    pub app_name: String,
    pub image: String,
    pub container_port: u16,
    pub health_check_path: String,
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub desired_count: u32,
    /// Fargate CPU units (256 = 0.25 vCPU).
    pub cpu: u32,
    pub memory_mib: u32,
    /// Fully qualified DNS name of the alias record.
    pub domain_name: String,
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u32,
    /// Extra variables for the container, inline values win over `env_file`.
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
    /// Optional dotenv file merged under `env_vars`.
    #[serde(default)]
    pub env_file: Option<String>,
    /// Values read from `env_file` when the table was loaded.
    #[serde(skip)]
    pub file_env_vars: BTreeMap<String, String>,
    /// Why `env_file` could not be read, if it could not.
    #[serde(skip)]
    pub env_file_error: Option<String>,
    #[serde(default)]
    pub routing: RoutingPolicy,
    #[serde(default)]
    pub deployment: DeploymentStrategy,
    pub regions: BTreeMap<String, RegionConfig>,
}

fn default_log_retention_days() -> u32 {
    30
}

/// Output of the environment resolver: the selected configuration and
/// its regions, ready for fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEnvironment {
    pub name: String,
    pub mode: StackMode,
    pub config: EnvironmentConfig,
    pub regions: Vec<(String, RegionConfig)>,
}
