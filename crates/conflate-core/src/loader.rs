//! Format loaders
//!
//! A loader turns raw text or bytes into a [`Value`] tree, and can re-read a
//! single string fragment through the format's own scalar grammar. The second
//! operation is what gives interpolated values their native types: an env var
//! holding `"65"` re-types to the integer 65 once substituted.
//!
//! `reparse_scalar` is lenient by contract: input that does not parse as the
//! format comes back unchanged as a string, never as an error.
//!
//! YAML and TOML support are cargo features (`yaml`, `toml`, both default-on);
//! JSON is always available because the engine's safe-quoting pass depends on
//! `serde_json` anyway.

use crate::error::{Error, Result};
use crate::value::Value;

/// Parses raw config input into a generic tree and re-types scalar fragments.
pub trait Loader: Send + Sync {
    /// Short format name, used in error messages
    fn name(&self) -> &'static str;

    /// Parse a complete document from text
    fn parse_str(&self, text: &str) -> Result<Value>;

    /// Parse a complete document from raw bytes
    fn parse_slice(&self, bytes: &[u8]) -> Result<Value> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            Error::parse(format!("{} input is not valid UTF-8: {}", self.name(), e))
        })?;
        self.parse_str(text)
    }

    /// Reinterpret a string fragment as a typed scalar (or nested structure).
    ///
    /// Best effort: malformed input is returned unchanged as a string.
    fn reparse_scalar(&self, text: &str) -> Value;
}

/// YAML loader backed by serde_yaml
#[cfg(feature = "yaml")]
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlLoader;

#[cfg(feature = "yaml")]
impl Loader for YamlLoader {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn parse_str(&self, text: &str) -> Result<Value> {
        serde_yaml::from_str(text).map_err(|e| Error::parse(e.to_string()))
    }

    fn reparse_scalar(&self, text: &str) -> Value {
        // An empty document is null, matching the YAML spec
        if text.trim().is_empty() {
            return Value::Null;
        }
        serde_yaml::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

/// JSON loader backed by serde_json
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLoader;

impl Loader for JsonLoader {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse_str(&self, text: &str) -> Result<Value> {
        serde_json::from_str(text).map_err(|e| Error::parse(e.to_string()))
    }

    fn reparse_scalar(&self, text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

/// TOML loader backed by the toml crate
#[cfg(feature = "toml")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlLoader;

#[cfg(feature = "toml")]
impl Loader for TomlLoader {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn parse_str(&self, text: &str) -> Result<Value> {
        toml::from_str(text).map_err(|e| Error::parse(e.to_string()))
    }

    fn reparse_scalar(&self, text: &str) -> Value {
        // TOML has no free-standing scalars; wrap the fragment in a dummy
        // assignment and pull the value back out.
        let doc = format!("v = {}", text);
        match toml::from_str::<indexmap::IndexMap<String, Value>>(&doc) {
            Ok(mut map) => map
                .shift_remove("v")
                .unwrap_or_else(|| Value::String(text.to_string())),
            Err(_) => Value::String(text.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[cfg(feature = "yaml")]
    #[test]
    fn test_yaml_parse_str() {
        let value = YamlLoader
            .parse_str("database:\n  host: localhost\n  port: 5432\n")
            .unwrap();
        assert_eq!(
            value.get_path("database.host").unwrap().as_str(),
            Some("localhost")
        );
        assert_eq!(value.get_path("database.port").unwrap().as_i64(), Some(5432));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_yaml_reparse_scalar() {
        assert_eq!(YamlLoader.reparse_scalar("65"), Value::Integer(65));
        assert_eq!(YamlLoader.reparse_scalar("6.5"), Value::Float(6.5));
        assert_eq!(YamlLoader.reparse_scalar("true"), Value::Bool(true));
        assert_eq!(YamlLoader.reparse_scalar(""), Value::Null);
        assert_eq!(
            YamlLoader.reparse_scalar("plain text"),
            Value::String("plain text".into())
        );
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_yaml_reparse_scalar_structure() {
        let value = YamlLoader.reparse_scalar(r#"{"log_level": "INFO"}"#);
        assert_eq!(
            value.get_path("log_level").unwrap().as_str(),
            Some("INFO")
        );
    }

    #[test]
    fn test_json_parse_str() {
        let value = JsonLoader
            .parse_str(r#"{"foo": {"bar": 1}, "baz": [true, null]}"#)
            .unwrap();
        assert_eq!(value.get_path("foo.bar").unwrap().as_i64(), Some(1));
        assert_eq!(value.get_path("baz[0]").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_json_parse_str_malformed() {
        assert!(JsonLoader.parse_str("{not json").is_err());
    }

    #[test]
    fn test_json_reparse_scalar() {
        assert_eq!(JsonLoader.reparse_scalar("65"), Value::Integer(65));
        assert_eq!(JsonLoader.reparse_scalar("null"), Value::Null);
        // Bare words are not JSON; they come back as the original string
        assert_eq!(
            JsonLoader.reparse_scalar("165abc"),
            Value::String("165abc".into())
        );
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_parse_str() {
        let value = TomlLoader
            .parse_str("[foo]\nbar = \"hello\"\nbaz = 7\n")
            .unwrap();
        assert_eq!(value.get_path("foo.bar").unwrap().as_str(), Some("hello"));
        assert_eq!(value.get_path("foo.baz").unwrap().as_i64(), Some(7));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_reparse_scalar() {
        assert_eq!(TomlLoader.reparse_scalar("4"), Value::Integer(4));
        assert_eq!(TomlLoader.reparse_scalar("true"), Value::Bool(true));
        assert_eq!(
            TomlLoader.reparse_scalar("\"quoted\""),
            Value::String("quoted".into())
        );
        // Bare words are not valid TOML values; unchanged
        assert_eq!(
            TomlLoader.reparse_scalar("a4sdf"),
            Value::String("a4sdf".into())
        );
    }

    #[test]
    fn test_parse_slice_rejects_invalid_utf8() {
        let err = JsonLoader.parse_slice(&[0xff, 0xfe]).unwrap_err();
        assert!(format!("{}", err).contains("UTF-8"));
    }
}
