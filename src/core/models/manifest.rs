use serde::{Deserialize, Serialize};

/// Record of one synthesis run, written next to the templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    /// From `CDK_DEFAULT_ACCOUNT` when set.
    pub account: Option<String>,
    pub tool_version: String,
    pub units: Vec<ManifestEntry>,
}

/// One deployment unit in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub stack_name: String,
    pub environment: String,
    pub region: String,
    pub mode: String,
    pub template_file: String,
    /// SHA-256 of the template file contents, lowercase hex.
    pub fingerprint: String,
    pub resource_count: usize,
    pub creation_order: Vec<String>,
}
