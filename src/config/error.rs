//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot render configuration as TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value parsed but makes no sense.
    #[error("Bad value for '{key}': {message}")]
    Invalid { key: String, message: String },

    /// An override variable is set to something unparseable.
    #[error("Bad value in environment variable {var}: {message}")]
    Env { var: String, message: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn env(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Env {
            var: var.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ConfigError::invalid("logging.level", "unknown level 'loud'");
        assert_eq!(
            err.to_string(),
            "Bad value for 'logging.level': unknown level 'loud'"
        );

        let err = ConfigError::env("GPS_BRIDGE_LOGGING_FORMAT", "expected pretty or compact");
        assert!(err.to_string().contains("GPS_BRIDGE_LOGGING_FORMAT"));
    }
}
