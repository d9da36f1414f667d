//! Engine configuration document.
use serde::Deserialize;

use crate::{
    dispatch::Builder,
    error::ConfigError,
    options::Options,
    registry::Declaration,
};

/// Default maximum query string length.
pub const DEFAULT_QUERY_STRING_LENGTH: usize = 1_000_000;

/// Deserializable engine configuration.
///
/// ```json
/// {
///     "parsers": ["urlencoded", ["json", {"length": 100000}]],
///     "pass": ["text/*"],
///     "query_string_length": 4096,
///     "read_timeout": 5000
/// }
/// ```
///
/// Keys other than `parsers`, `pass` and `query_string_length` are root
/// options given to every parser.
#[derive(Debug, Clone, Deserialize)]
pub struct ParsersConfig {
    pub parsers: Vec<Declaration>,
    #[serde(default)]
    pub pass: Vec<String>,
    #[serde(default = "default_query_string_length")]
    pub query_string_length: usize,
    #[serde(flatten)]
    pub options: Options,
}

fn default_query_string_length() -> usize {
    DEFAULT_QUERY_STRING_LENGTH
}

impl ParsersConfig {
    /// Load configuration from a JSON document.
    pub fn from_json(src: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(src)?)
    }

    /// Start a [`Builder`] from this configuration.
    pub fn into_builder(self) -> Builder {
        let mut builder = Builder::new()
            .pass(self.pass)
            .query_string_length(self.query_string_length)
            .options(self.options);
        for declaration in self.parsers {
            builder = builder.declare(declaration);
        }
        builder
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn load_json() {
        let config = ParsersConfig::from_json(
            r#"{
                "parsers": ["urlencoded", ["json", {"length": 100}]],
                "pass": ["text/*"],
                "read_timeout": 5000
            }"#,
        )
        .unwrap();

        assert_eq!(config.parsers.len(), 2);
        assert_eq!(config.pass, ["text/*"]);
        assert_eq!(config.query_string_length, DEFAULT_QUERY_STRING_LENGTH);
        assert_eq!(config.options.get_u64("read_timeout"), Some(5000));
        assert!(config.options.get("parsers").is_none());
    }

    #[test]
    fn missing_parsers() {
        let err = ParsersConfig::from_json(r#"{"pass": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Deserialize(_)));
    }
}
