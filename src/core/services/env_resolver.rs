use std::collections::BTreeMap;

use crate::config::app_config::EnvironmentTable;
use crate::core::errors::{ForgeError, Result};
use crate::core::models::environment::{EnvironmentConfig, ResolvedEnvironment, StackMode};
use crate::core::services::config_check::ConfigCheck;

/// Variables every container receives. Custom configuration can never
/// override them.
pub const SYSTEM_KEYS: [&str; 2] = ["ENVIRONMENT", "REGION"];

/// Resolves an environment name and stack mode against the table.
///
/// Fails closed: an unknown environment, an unknown mode, or an
/// environment that violates any invariant stops the run before a single
/// resource is described.
pub struct EnvResolver;

impl EnvResolver {
    /// Look up `name` and parse `mode` into a resolved environment.
    ///
    /// Regions come back in ascending order, one deployment unit each.
    ///
    /// # Errors
    ///
    /// - `ConfigurationNotFound` if the environment is not in the table.
    /// - `UnsupportedMode` if `mode` is not a known stack type.
    /// - `InvalidConfig` listing every violated invariant.
    pub fn resolve(
        &self,
        name: &str,
        mode: &str,
        table: &EnvironmentTable,
    ) -> Result<ResolvedEnvironment> {
        let config = table
            .get(name)
            .ok_or_else(|| ForgeError::ConfigurationNotFound {
                name: name.to_string(),
                available: table.names().join(", "),
            })?;

        let mode: StackMode = mode.parse()?;

        let issues = ConfigCheck.check_environment(name, config);
        if !issues.is_empty() {
            let listed: Vec<String> = issues.iter().map(|i| format!("\n    → {i}")).collect();
            return Err(ForgeError::InvalidConfig {
                detail: format!(
                    "environment '{name}' has {} problem(s):{}",
                    issues.len(),
                    listed.concat()
                ),
            });
        }

        let regions = config
            .regions
            .iter()
            .map(|(region, rc)| (region.clone(), rc.clone()))
            .collect();

        tracing::debug!(environment = name, %mode, "resolved environment");

        Ok(ResolvedEnvironment {
            name: name.to_string(),
            mode,
            config: config.clone(),
            regions,
        })
    }

    /// Resolve, then keep only `region` when one is given.
    ///
    /// # Errors
    ///
    /// Everything [`EnvResolver::resolve`] returns, plus `RegionNotFound`
    /// when the filter names a region the environment does not have.
    pub fn resolve_in(
        &self,
        name: &str,
        mode: &str,
        region: Option<&str>,
        table: &EnvironmentTable,
    ) -> Result<ResolvedEnvironment> {
        let mut resolved = self.resolve(name, mode, table)?;

        if let Some(wanted) = region {
            let available: Vec<String> = resolved.regions.iter().map(|(r, _)| r.clone()).collect();
            resolved.regions.retain(|(r, _)| r == wanted);
            if resolved.regions.is_empty() {
                return Err(ForgeError::RegionNotFound {
                    environment: name.to_string(),
                    region: wanted.to_string(),
                    available: available.join(", "),
                });
            }
        }

        Ok(resolved)
    }

    /// Build the container environment for one deployment unit.
    ///
    /// 1. Values from `env_file`.
    /// 2. Inline `env_vars`, replacing file values with the same name.
    /// 3. `ENVIRONMENT` and `REGION`, inserted last so nothing custom can
    ///    shadow them.
    pub fn container_environment(
        environment: &str,
        region: &str,
        config: &EnvironmentConfig,
    ) -> BTreeMap<String, String> {
        let mut vars = config.file_env_vars.clone();
        vars.extend(
            config
                .env_vars
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        vars.insert(SYSTEM_KEYS[0].to_string(), environment.to_string());
        vars.insert(SYSTEM_KEYS[1].to_string(), region.to_string());
        vars
    }
}
