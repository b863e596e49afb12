//! Main Config type for conflate
//!
//! A Config wraps a resolved tree together with the original unresolved tree,
//! the loader that produced it, and the registry used for resolution. Keeping
//! the original around is what makes [`refresh`](Config::refresh) possible:
//! interpolation sources that change during the process's life (env vars in
//! tests, rotated secret files) can be re-evaluated without re-reading the
//! source file.

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::interpolate::{default_registry, Registry};
use crate::loader::{JsonLoader, Loader};
use crate::process::post_process;
use crate::value::Value;

#[cfg(feature = "toml")]
use crate::loader::TomlLoader;
#[cfg(feature = "yaml")]
use crate::loader::YamlLoader;

/// The nested, lazily-expanding read view over a resolved document tree.
#[derive(Clone)]
pub struct Config {
    /// The resolved tree this facade exposes
    resolved: Value,
    /// The original unresolved tree, kept for refresh
    source: Value,
    /// Loader used to parse and re-type values
    loader: Arc<dyn Loader>,
    /// Registry resolution runs against
    registry: Registry,
}

impl Config {
    /// Parse `text` with `loader`, resolve all directives, and wrap the result.
    pub fn from_loader(loader: Arc<dyn Loader>, text: &str, registry: &Registry) -> Result<Self> {
        let source = loader.parse_str(text)?;
        let resolved = post_process(loader.as_ref(), &source, registry)?;
        Ok(Self {
            resolved,
            source,
            loader,
            registry: registry.clone(),
        })
    }

    /// Read `path` and load it through `loader`.
    pub fn from_loader_file(
        loader: Arc<dyn Loader>,
        path: impl AsRef<Path>,
        registry: &Registry,
    ) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::io(format!("failed to read '{}': {}", path.display(), e)))?;
        let source = loader.parse_slice(&bytes)?;
        let resolved = post_process(loader.as_ref(), &source, registry)?;
        Ok(Self {
            resolved,
            source,
            loader,
            registry: registry.clone(),
        })
    }

    fn snapshot_default_registry() -> Registry {
        default_registry()
            .read()
            .expect("default registry lock poisoned")
            .clone()
    }

    /// Load configuration from a YAML string
    #[cfg(feature = "yaml")]
    pub fn from_yaml(text: &str) -> Result<Self> {
        Self::from_loader(Arc::new(YamlLoader), text, &Self::snapshot_default_registry())
    }

    /// Load configuration from a YAML string with an explicit registry
    #[cfg(feature = "yaml")]
    pub fn from_yaml_with(text: &str, registry: &Registry) -> Result<Self> {
        Self::from_loader(Arc::new(YamlLoader), text, registry)
    }

    /// Load configuration from a YAML file
    #[cfg(feature = "yaml")]
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_loader_file(Arc::new(YamlLoader), path, &Self::snapshot_default_registry())
    }

    /// Load configuration from a YAML file with an explicit registry
    #[cfg(feature = "yaml")]
    pub fn from_yaml_file_with(path: impl AsRef<Path>, registry: &Registry) -> Result<Self> {
        Self::from_loader_file(Arc::new(YamlLoader), path, registry)
    }

    /// Load configuration from a JSON string
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_loader(Arc::new(JsonLoader), text, &Self::snapshot_default_registry())
    }

    /// Load configuration from a JSON string with an explicit registry
    pub fn from_json_with(text: &str, registry: &Registry) -> Result<Self> {
        Self::from_loader(Arc::new(JsonLoader), text, registry)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_loader_file(Arc::new(JsonLoader), path, &Self::snapshot_default_registry())
    }

    /// Load configuration from a JSON file with an explicit registry
    pub fn from_json_file_with(path: impl AsRef<Path>, registry: &Registry) -> Result<Self> {
        Self::from_loader_file(Arc::new(JsonLoader), path, registry)
    }

    /// Load configuration from a TOML string
    #[cfg(feature = "toml")]
    pub fn from_toml(text: &str) -> Result<Self> {
        Self::from_loader(Arc::new(TomlLoader), text, &Self::snapshot_default_registry())
    }

    /// Load configuration from a TOML string with an explicit registry
    #[cfg(feature = "toml")]
    pub fn from_toml_with(text: &str, registry: &Registry) -> Result<Self> {
        Self::from_loader(Arc::new(TomlLoader), text, registry)
    }

    /// Load configuration from a TOML file
    #[cfg(feature = "toml")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_loader_file(Arc::new(TomlLoader), path, &Self::snapshot_default_registry())
    }

    /// Load configuration from a TOML file with an explicit registry
    #[cfg(feature = "toml")]
    pub fn from_toml_file_with(path: impl AsRef<Path>, registry: &Registry) -> Result<Self> {
        Self::from_loader_file(Arc::new(TomlLoader), path, registry)
    }

    /// Get a resolved value by dotted path (e.g., "database.host")
    ///
    /// A missing key is a distinct key-not-found error.
    pub fn get(&self, path: &str) -> Result<&Value> {
        self.resolved.get_path(path)
    }

    /// Get a child facade over the mapping at `path`, built on demand.
    ///
    /// The child carries its own slice of the resolved and original trees, so
    /// refresh on the child re-resolves just that subtree.
    pub fn section(&self, path: &str) -> Result<Config> {
        let sub = self.resolved.get_path(path)?;
        if !sub.is_mapping() {
            return Err(Error::type_coercion(path, "mapping", sub.type_name()));
        }

        // The source subtree can be missing when resolution introduced
        // structure (a JSON env value, say); fall back to the resolved form.
        let source = self
            .source
            .get_path(path)
            .cloned()
            .unwrap_or_else(|_| sub.clone());

        Ok(Config {
            resolved: sub.clone(),
            source,
            loader: self.loader.clone(),
            registry: self.registry.clone(),
        })
    }

    /// Get a resolved string value, with type coercion if needed
    pub fn get_string(&self, path: &str) -> Result<String> {
        let value = self.get(path)?;
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok("null".to_string()),
            _ => Err(Error::type_coercion(path, "string", value.type_name())),
        }
    }

    /// Get a resolved integer value, with type coercion if needed
    pub fn get_i64(&self, path: &str) -> Result<i64> {
        let value = self.get(path)?;
        match value {
            Value::Integer(i) => Ok(*i),
            Value::String(s) => s
                .parse()
                .map_err(|_| Error::type_coercion(path, "integer", format!("string (\"{}\")", s))),
            _ => Err(Error::type_coercion(path, "integer", value.type_name())),
        }
    }

    /// Get a resolved float value, with type coercion if needed
    pub fn get_f64(&self, path: &str) -> Result<f64> {
        let value = self.get(path)?;
        match value {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            Value::String(s) => s
                .parse()
                .map_err(|_| Error::type_coercion(path, "float", format!("string (\"{}\")", s))),
            _ => Err(Error::type_coercion(path, "float", value.type_name())),
        }
    }

    /// Get a resolved boolean value, with strict coercion
    pub fn get_bool(&self, path: &str) -> Result<bool> {
        let value = self.get(path)?;
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(Error::type_coercion(
                    path,
                    "boolean",
                    format!("string (\"{}\") - only \"true\" or \"false\" allowed", s),
                )),
            },
            _ => Err(Error::type_coercion(path, "boolean", value.type_name())),
        }
    }

    /// Iterate over the top-level key/value pairs of the resolved mapping.
    ///
    /// Non-mapping roots iterate as empty.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.resolved
            .as_mapping()
            .into_iter()
            .flat_map(|m| m.iter())
    }

    /// Iterate over the top-level keys of the resolved mapping
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(k, _)| k.as_str())
    }

    /// Re-run interpolation against the original unresolved tree and merge
    /// the result into the resolved view in place.
    ///
    /// Interpolator caches (the FILE memo, say) are left alone; clear them
    /// explicitly before refreshing when stale reads matter.
    pub fn refresh(&mut self) -> Result<()> {
        let update = post_process(self.loader.as_ref(), &self.source, &self.registry)?;
        self.resolved.merge(update);
        Ok(())
    }

    /// Borrow the resolved tree
    pub fn as_value(&self) -> &Value {
        &self.resolved
    }

    /// Deep-copy the resolved tree (dict-like export)
    pub fn to_value(&self) -> Value {
        self.resolved.clone()
    }

    /// Serialize the resolved tree as JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.resolved).map_err(|e| Error::parse(e.to_string()))
    }

    /// Serialize the resolved tree as YAML
    #[cfg(feature = "yaml")]
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.resolved).map_err(|e| Error::parse(e.to_string()))
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        self.resolved == other.resolved
    }
}

impl PartialEq<Value> for Config {
    fn eq(&self, other: &Value) -> bool {
        &self.resolved == other
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config({})", self.resolved)
    }
}
