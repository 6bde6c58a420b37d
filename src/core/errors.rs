use std::path::PathBuf;

/// Broad classification of a [`ForgeError`].
///
/// Configuration errors abort before anything is handed to the
/// provisioning engine. Collaborator errors come from the engine itself
/// and are surfaced verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Collaborator,
    Io,
}

/// All domain errors for ecsforge.
///
/// Each variant provides enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error(
        "Environment '{name}' not found\n\n  \
         Available environments: {available}\n  \
         Run 'ecsforge environments' to see the configured table."
    )]
    ConfigurationNotFound { name: String, available: String },

    #[error(
        "Region '{region}' is not configured for environment '{environment}'\n\n  \
         Configured regions: {available}"
    )]
    RegionNotFound {
        environment: String,
        region: String,
        available: String,
    },

    #[error(
        "Unsupported stack type '{mode}'\n\n  \
         Supported stack types: standard, explicit-resource"
    )]
    UnsupportedMode { mode: String },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error(
        "Parse error in {file}: {detail}\n\n  \
         Expected format: KEY=value (one per line).\n  \
         Comments (#) and blank lines are allowed."
    )]
    ParseError { file: PathBuf, detail: String },

    #[error(
        "Configuration file not found: {path}\n\n  \
         Pass --config <file>, set ECSFORGE_CONFIG, or remove the flag\n  \
         to use the built-in environment table."
    )]
    ConfigNotFound { path: PathBuf },

    #[error(
        "This environment table uses format version {table_version}, but this \
         ecsforge only supports up to version {supported_version}.\n\n  \
         Upgrade ecsforge or pin the table to an older format."
    )]
    FormatVersionTooNew {
        table_version: u32,
        supported_version: u32,
    },

    #[error("Resource '{logical_id}' is declared twice in stack '{stack}'")]
    DuplicateResource { stack: String, logical_id: String },

    #[error("Resource '{from}' references '{target}', which is not declared in the stack")]
    UnknownReference { from: String, target: String },

    #[error(
        "Dependency cycle between resources: {members}\n\n  \
         Resources must form a directed acyclic graph."
    )]
    DependencyCycle { members: String },

    #[error(
        "{tool} failed: {detail}\n\n  \
         The provisioning engine reported the error above. ecsforge does not retry;\n  \
         fix the cause and run the command again."
    )]
    Collaborator { tool: String, detail: String },

    #[error("Template error: {detail}")]
    Template { detail: String },

    #[error("{count} difference(s) found against the previous synthesis")]
    DifferencesFound { count: usize },

    #[error("Aborted by operator")]
    Aborted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ForgeError {
    /// Which side of the collaborator boundary produced this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Collaborator { .. } => ErrorKind::Collaborator,
            Self::Io(_) | Self::Template { .. } => ErrorKind::Io,
            _ => ErrorKind::Configuration,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_errors_are_classified_separately() {
        let err = ForgeError::Collaborator {
            tool: "aws".into(),
            detail: "exit status 254".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Collaborator);
        assert!(err.to_string().contains("exit status 254"));
    }

    #[test]
    fn lookup_failures_are_configuration_errors() {
        let err = ForgeError::ConfigurationNotFound {
            name: "nonexistent".into(),
            available: "dev, qa".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(
            ForgeError::UnsupportedMode {
                mode: "bogus".into()
            }
            .kind(),
            ErrorKind::Configuration
        );
    }
}
