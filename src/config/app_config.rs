use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::adapters::parsers::dotenv_parser::DotenvParser;
use crate::core::errors::{ForgeError, Result};
use crate::core::models::environment::EnvironmentConfig;
use crate::core::traits::parser::VariableParser;

/// Current format version supported by this build of ecsforge.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// File picked up from the working directory when no `--config` is given.
pub const LOCAL_TABLE_FILE: &str = "ecsforge.toml";

const BUILTIN_TABLE: &str = include_str!("environments.toml");

/// Where the table was read from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TableSource {
    #[default]
    Builtin,
    File(PathBuf),
}

impl std::fmt::Display for TableSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin => f.write_str("built-in table"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The environment table: every known environment and its regions.
///
/// Loaded once at process start and passed by reference afterwards;
/// nothing mutates it after [`EnvironmentTable::from_toml`] returns.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentTable {
    #[serde(default)]
    pub settings: Settings,
    pub environments: BTreeMap<String, EnvironmentConfig>,
    #[serde(skip)]
    pub source: TableSource,
}

/// The `[settings]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Format version for backward compatibility. Defaults to 1 if missing.
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    #[serde(default = "default_environment")]
    pub default_environment: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format_version: default_format_version(),
            default_environment: default_environment(),
        }
    }
}

fn default_format_version() -> u32 {
    1
}

fn default_environment() -> String {
    "dev".to_string()
}

impl EnvironmentTable {
    /// The table compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_TABLE, TableSource::Builtin)
    }

    /// Load a table from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ForgeError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content, TableSource::File(path.to_path_buf()))
    }

    /// Pick the table for this invocation: an explicit path, then
    /// `./ecsforge.toml`, then the built-in table.
    pub fn discover(explicit: Option<&str>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(Path::new(path));
        }
        let local = Path::new(LOCAL_TABLE_FILE);
        if local.exists() {
            return Self::load(local);
        }
        Self::builtin()
    }

    /// Parse a table, gate on the format version, validate environment
    /// names and read every referenced `env_file`.
    ///
    /// Semantic checks (capacity bounds, certificate regions, ...) are the
    /// job of `ConfigCheck`, so one broken environment does not block the
    /// others from being listed. An unreadable `env_file` is kept on its
    /// environment and reported by that check.
    pub fn from_toml(content: &str, source: TableSource) -> Result<Self> {
        let mut table: Self = toml::from_str(content).map_err(|e| ForgeError::InvalidConfig {
            detail: format!("Failed to parse environment table ({source}): {e}"),
        })?;
        table.source = source;

        if table.settings.format_version > CURRENT_FORMAT_VERSION {
            return Err(ForgeError::FormatVersionTooNew {
                table_version: table.settings.format_version,
                supported_version: CURRENT_FORMAT_VERSION,
            });
        }

        for name in table.environments.keys() {
            validate_env_name(name)?;
        }

        let base_dir = match &table.source {
            TableSource::File(path) => path.parent().map(Path::to_path_buf).unwrap_or_default(),
            TableSource::Builtin => PathBuf::new(),
        };
        for (name, env) in table.environments.iter_mut() {
            if let Some(file) = env.env_file.clone() {
                match read_env_file(&base_dir.join(&file)) {
                    Ok(vars) => env.file_env_vars = vars,
                    Err(message) => {
                        tracing::debug!(environment = %name, env_file = %file, "env_file unreadable");
                        env.env_file_error = Some(message);
                    }
                }
            }
        }

        Ok(table)
    }

    pub fn get(&self, name: &str) -> Option<&EnvironmentConfig> {
        self.environments.get(name)
    }

    /// Environment names in ascending order.
    pub fn names(&self) -> Vec<&str> {
        self.environments.keys().map(String::as_str).collect()
    }
}

fn read_env_file(path: &Path) -> std::result::Result<BTreeMap<String, String>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("env_file {} could not be read: {e}", path.display()))?;
    DotenvParser.parse(&content, path).map_err(|e| match e {
        ForgeError::ParseError { detail, .. } => {
            format!("env_file {} is malformed: {detail}", path.display())
        }
        other => other.to_string(),
    })
}

/// Environment names end up in stack names and log group names, so they
/// are restricted to lowercase letters, digits and dashes.
pub fn validate_env_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ForgeError::InvalidConfig {
            detail: format!(
                "invalid environment name '{name}': use lowercase letters, digits and '-', \
                 starting with a letter"
            ),
        })
    }
}
