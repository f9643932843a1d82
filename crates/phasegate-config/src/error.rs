//! Configuration errors

use std::path::PathBuf;

/// Errors while reading or interpreting configuration values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required key is absent
    #[error("missing configuration key: {0}")]
    Missing(String),

    /// A value could not be converted to the requested type
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Parse {
        key: String,
        value: String,
        reason: String,
    },

    /// IO error while loading a configuration file
    #[error("io error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML
    #[error("invalid TOML in {}: {message}", path.display())]
    Toml { path: PathBuf, message: String },
}

impl ConfigError {
    /// Create parse error for key
    pub fn parse(key: impl Into<String>, value: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            key: key.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
