//! Error types for taxsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from configuration and schema operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse configuration at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None` — cannot locate `~/.taxsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// No connection configuration exists at the expected path.
    #[error("connection not found at {path}")]
    ConnectionNotFound { path: PathBuf },

    /// The configured default language has no mapping in the language map.
    #[error("default language '{language}' is missing from the language map")]
    MissingDefaultLanguage { language: String },

    /// A field schema with this id is already registered.
    #[error("field '{field_id}' is already registered")]
    DuplicateField { field_id: String },

    /// A field schema entry failed validation.
    #[error("invalid field '{field_id}': {reason}")]
    InvalidField { field_id: String, reason: String },
}
