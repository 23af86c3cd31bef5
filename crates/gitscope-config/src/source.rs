//! Configuration layers and the loader that stacks them
//!
//! A loader starts from [`ApplicationConfig::default`] and hands the result
//! of each layer to the next, so later layers win key by key. A typical
//! stack is an optional TOML file followed by `GITSCOPE_*` variables.

use crate::validation::Validate;
use crate::{ApplicationConfig, ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// One layer of configuration applied on top of what came before
pub trait ConfigurationSource {
    /// # Errors
    /// Unreadable or malformed input; the loader stops at the first error
    fn apply(&self, base: ApplicationConfig) -> ConfigResult<ApplicationConfig>;

    fn name(&self) -> &str;
}

/// Overrides from `GITSCOPE_*` environment variables; unset variables keep
/// the value of the layer below
pub struct EnvironmentSource;

impl ConfigurationSource for EnvironmentSource {
    fn apply(&self, base: ApplicationConfig) -> ConfigResult<ApplicationConfig> {
        Ok(base.overlay_env())
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}

/// Keys from a TOML file, merged table by table into the layer below
///
/// A file that does not exist contributes nothing.
pub struct TomlFileSource {
    path: PathBuf,
}

impl TomlFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn malformed(&self, source: toml::de::Error) -> ConfigError {
        ConfigError::Malformed {
            path: self.path.clone(),
            source,
        }
    }
}

impl ConfigurationSource for TomlFileSource {
    fn apply(&self, base: ApplicationConfig) -> ConfigResult<ApplicationConfig> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No configuration file, skipping");
                return Ok(base);
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let overrides: Table = content.parse().map_err(|e| self.malformed(e))?;

        let Value::Table(mut merged) = Value::try_from(&base)? else {
            return Ok(base);
        };
        merge_tables(&mut merged, overrides);
        Value::Table(merged)
            .try_into()
            .map_err(|e| self.malformed(e))
    }

    fn name(&self) -> &'static str {
        "toml_file"
    }
}

/// Deep-merge `overrides` into `into`; scalars and arrays are replaced whole
fn merge_tables(into: &mut Table, overrides: Table) {
    for (key, value) in overrides {
        match (into.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(nested)) => merge_tables(existing, nested),
            (_, value) => {
                into.insert(key, value);
            }
        }
    }
}

/// Stacks configuration layers in the order they were added
#[derive(Default)]
pub struct ConfigurationLoader {
    layers: Vec<Box<dyn ConfigurationSource>>,
}

impl ConfigurationLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add_source(mut self, source: Box<dyn ConfigurationSource>) -> Self {
        self.layers.push(source);
        self
    }

    /// Apply every layer over the defaults and validate the result
    ///
    /// # Errors
    /// The first layer that fails to apply, or the first invalid value
    pub fn load(&self) -> ConfigResult<ApplicationConfig> {
        let mut config = ApplicationConfig::default();
        for layer in &self.layers {
            config = layer.apply(config)?;
            tracing::debug!(source = layer.name(), "Applied configuration layer");
        }

        config.validate()?;
        Ok(config)
    }
}
