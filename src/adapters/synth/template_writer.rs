use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::core::errors::{ForgeError, Result};
use crate::core::models::deployment_unit::DeploymentUnit;
use crate::core::models::manifest::{Manifest, ManifestEntry};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Compute the SHA256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Writes synthesized templates and the manifest into an output directory.
///
/// Layout:
///
/// ```text
/// <out_dir>/
///   manifest.json
///   <stack_name>.template.json   (one per deployment unit)
/// ```
pub struct TemplateWriter {
    out_dir: PathBuf,
}

impl TemplateWriter {
    pub fn new(out_dir: &Path) -> Self {
        Self {
            out_dir: out_dir.to_path_buf(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn template_path(&self, unit: &DeploymentUnit) -> PathBuf {
        self.out_dir.join(unit.template_file_name())
    }

    /// Write every unit's template plus the manifest.
    ///
    /// Existing templates for the same stacks are overwritten; templates of
    /// other stacks are left alone.
    pub fn write(&self, units: &[DeploymentUnit], account: Option<&str>) -> Result<Manifest> {
        fs::create_dir_all(&self.out_dir)?;

        let mut entries = Vec::with_capacity(units.len());
        for unit in units {
            let mut body = unit.template.to_json_pretty()?;
            body.push('\n');

            let path = self.template_path(unit);
            fs::write(&path, &body)?;
            tracing::debug!(path = %path.display(), "wrote template");

            entries.push(ManifestEntry {
                stack_name: unit.stack_name.clone(),
                environment: unit.environment.clone(),
                region: unit.region.clone(),
                mode: unit.mode.to_string(),
                template_file: unit.template_file_name(),
                fingerprint: sha256_hex(body.as_bytes()),
                resource_count: unit.template.resources.len(),
                creation_order: unit
                    .template
                    .creation_order()
                    .into_iter()
                    .map(String::from)
                    .collect(),
            });
        }

        let manifest = Manifest {
            generated_at: chrono::Utc::now(),
            account: account.map(String::from),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            units: entries,
        };

        let json = serde_json::to_string_pretty(&manifest).map_err(|e| ForgeError::Template {
            detail: format!("Failed to serialize manifest: {e}"),
        })?;
        fs::write(self.out_dir.join(MANIFEST_FILE), format!("{json}\n"))?;

        Ok(manifest)
    }

    /// The template previously written for `unit`, if any.
    pub fn read_previous(&self, unit: &DeploymentUnit) -> Result<Option<Value>> {
        let path = self.template_path(unit);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let value = serde_json::from_str(&content).map_err(|e| ForgeError::Template {
            detail: format!("Cannot parse previous template {}: {e}", path.display()),
        })?;
        Ok(Some(value))
    }

    /// The manifest of the last synthesis, if any.
    pub fn read_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.out_dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let manifest = serde_json::from_str(&content).map_err(|e| ForgeError::Template {
            detail: format!("Cannot parse {}: {e}", path.display()),
        })?;
        Ok(Some(manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::environment::StackMode;
    use crate::core::models::template::{Resource, Template};
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn unit(region: &str) -> DeploymentUnit {
        DeploymentUnit {
            stack_name: format!("orders-api-qa-{region}"),
            environment: "qa".into(),
            region: region.into(),
            mode: StackMode::Standard,
            template: Template {
                description: "t".into(),
                resources: vec![
                    Resource::new("LogGroup", "AWS::Logs::LogGroup", json!({})),
                    Resource::new("Cluster", "AWS::ECS::Cluster", json!({})),
                ],
                outputs: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn sha256_hex_produces_correct_hash() {
        let hash = sha256_hex(b"hello world");
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn writes_one_template_per_unit_and_manifest() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let writer = TemplateWriter::new(&out);

        let manifest = writer
            .write(&[unit("us-east-1"), unit("us-west-2")], Some("123456789012"))
            .unwrap();

        assert!(out.join("orders-api-qa-us-east-1.template.json").exists());
        assert!(out.join("orders-api-qa-us-west-2.template.json").exists());
        assert!(out.join(MANIFEST_FILE).exists());

        assert_eq!(manifest.units.len(), 2);
        assert_eq!(manifest.account.as_deref(), Some("123456789012"));
        let entry = &manifest.units[0];
        assert_eq!(entry.mode, "standard");
        assert_eq!(entry.resource_count, 2);
        assert_eq!(entry.creation_order, vec!["LogGroup", "Cluster"]);

        let body = fs::read(out.join(&entry.template_file)).unwrap();
        assert_eq!(entry.fingerprint, sha256_hex(&body));
        assert!(body.ends_with(b"}\n"));
    }

    #[test]
    fn manifest_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let writer = TemplateWriter::new(dir.path());

        let written = writer.write(&[unit("us-east-1")], None).unwrap();
        let read = writer.read_manifest().unwrap().unwrap();

        assert_eq!(read, written);
    }

    #[test]
    fn previous_template_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let writer = TemplateWriter::new(dir.path());

        assert!(writer.read_previous(&unit("us-east-1")).unwrap().is_none());
        assert!(writer.read_manifest().unwrap().is_none());
    }

    #[test]
    fn previous_template_is_read_back() {
        let dir = TempDir::new().unwrap();
        let writer = TemplateWriter::new(dir.path());
        let u = unit("us-east-1");
        writer.write(std::slice::from_ref(&u), None).unwrap();

        let previous = writer.read_previous(&u).unwrap().unwrap();

        assert_eq!(previous["Resources"]["Cluster"]["Type"], "AWS::ECS::Cluster");
    }

    #[test]
    fn corrupt_previous_template_is_an_error() {
        let dir = TempDir::new().unwrap();
        let writer = TemplateWriter::new(dir.path());
        let u = unit("us-east-1");
        fs::write(writer.template_path(&u), "{ not json").unwrap();

        assert!(writer.read_previous(&u).is_err());
    }
}
