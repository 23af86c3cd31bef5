//! Errors raised while reading or checking configuration

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field}: not a postgres:// URL")]
    InvalidUrl { field: &'static str, url: String },

    #[error("{field} must not be empty")]
    Missing { field: &'static str },

    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("telemetry.tracing_level: unknown level '{0}'")]
    UnknownTracingLevel(String),

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not TOML, or its values do not fit the configuration shape
    #[error("malformed configuration in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot render configuration as TOML: {0}")]
    Render(#[from] toml::ser::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
