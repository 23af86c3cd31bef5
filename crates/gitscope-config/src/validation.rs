//! Field checks shared by the configuration sections
//!
//! Every check takes the dotted path of the field it guards so the error
//! points straight at the offending key.

use crate::{ConfigError, ConfigResult};
use regex::Regex;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

const URL_SCHEMES: [&str; 2] = ["postgres", "postgresql"];

static URL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^postgres(ql)?://[^\s/?#]+(/\S*)?$").ok());

/// A configuration section that can check its own values
pub trait Validate {
    /// # Errors
    /// The first value found outside its allowed domain
    fn validate(&self) -> ConfigResult<()>;
}

/// `value` must be a `postgres://` or `postgresql://` URL with a host
///
/// # Errors
/// `ConfigError::InvalidUrl`
pub fn database_url(field: &'static str, value: &str) -> ConfigResult<()> {
    let valid = URL_PATTERN.as_ref().map_or_else(
        || {
            value
                .split_once("://")
                .is_some_and(|(scheme, rest)| URL_SCHEMES.contains(&scheme) && !rest.is_empty())
        },
        |pattern| pattern.is_match(value),
    );

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            field,
            url: value.to_string(),
        })
    }
}

/// # Errors
/// `ConfigError::OutOfRange`
pub fn within(field: &'static str, value: u64, bounds: RangeInclusive<u64>) -> ConfigResult<()> {
    if bounds.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: *bounds.start(),
            max: *bounds.end(),
        })
    }
}

/// # Errors
/// `ConfigError::Missing` for empty or whitespace-only values
pub fn present(field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        Err(ConfigError::Missing { field })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_accepts_postgres_schemes() {
        assert!(database_url("database.url", "postgresql://gitscope@localhost:5432/gitscope").is_ok());
        assert!(database_url("database.url", "postgres://db").is_ok());
    }

    #[test]
    fn test_database_url_rejects_other_schemes_or_missing_host() {
        assert!(database_url("database.url", "localhost:5432").is_err());
        assert!(database_url("database.url", "postgres://").is_err());
        assert!(database_url("database.url", "mysql://db/gitscope").is_err());
        assert!(database_url("database.url", "https://gitlab.example.com").is_err());
    }

    #[test]
    fn test_within_names_field_and_bounds() {
        let error = within("indexer.concurrency", 0, 1..=256).unwrap_err();
        assert_eq!(error.to_string(), "indexer.concurrency = 0 is outside 1..=256");
        assert!(within("indexer.concurrency", 256, 1..=256).is_ok());
    }

    #[test]
    fn test_present_rejects_whitespace() {
        assert!(matches!(
            present("database.host", "   "),
            Err(ConfigError::Missing { field: "database.host" })
        ));
        assert!(present("database.host", "db").is_ok());
    }
}
