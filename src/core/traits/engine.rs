use std::path::Path;

use crate::core::errors::Result;
use crate::core::models::deployment_unit::DeploymentUnit;

/// Port for the engine that turns a template into live infrastructure.
///
/// Implementations live in `adapters::engine`. The core layer never talks
/// to a cloud provider directly; it hands over one unit at a time and
/// surfaces whatever the engine reports.
pub trait ProvisioningEngine: Send + Sync {
    /// Create or update the stack of `unit` from the template at
    /// `template_path`.
    fn deploy(&self, unit: &DeploymentUnit, template_path: &Path) -> Result<()>;

    /// Delete the stack of `unit` and wait until it is gone.
    fn destroy(&self, unit: &DeploymentUnit) -> Result<()>;

    /// Human-readable name of this engine (e.g. "cloudformation").
    fn name(&self) -> &str;
}
