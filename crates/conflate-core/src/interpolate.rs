//! Interpolator capability and registry
//!
//! An interpolator resolves a directive name to a string value for one TYPE
//! tag. Built-ins:
//!
//! - `ENV` - process environment variables
//! - `FILE` - file contents by path, memoized per instance
//! - `DOCKER_SECRET` - `<NAME>_FILE` env indirection with env fallback
//!   (opt-in, see [`DockerSecretInterpolator::register_into`])
//!
//! A [`Registry`] maps tags to interpolator instances. The engine always takes
//! a registry explicitly; a process-wide default registry exists only as a
//! convenience snapshot source for `Config` constructors and as a registration
//! point for plugin crates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::{Error, Result};

/// Pluggable resolver for one TYPE of external value source.
pub trait Interpolator: Send + Sync {
    /// Resolve `name` to its string value.
    ///
    /// A missing value must be reported with a not-found error kind (see
    /// [`Error::is_not_found`]) so that directive defaults can substitute for
    /// it; any other error is surfaced to the caller as-is.
    fn lookup(&self, name: &str) -> Result<String>;

    /// Resolve `name`, falling back to `default` when the value is missing.
    ///
    /// The default comes back unchanged, as a string. Errors other than
    /// not-found still propagate.
    fn lookup_or(&self, name: &str, default: &str) -> Result<String> {
        match self.lookup(name) {
            Ok(value) => Ok(value),
            Err(e) if e.is_not_found() => Ok(default.to_string()),
            Err(e) => Err(e),
        }
    }

    /// Whether resolved values may be re-read through the loader's scalar
    /// grammar to recover native types.
    ///
    /// Defaults to true. Interpolators whose values are opaque payloads (file
    /// contents, secrets) return false so that data which merely looks like
    /// structured syntax is never reinterpreted.
    fn parse_safe(&self) -> bool {
        true
    }
}

/// Environment variable interpolator (tag `ENV`)
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvInterpolator;

impl Interpolator for EnvInterpolator {
    fn lookup(&self, name: &str) -> Result<String> {
        match std::env::var(name) {
            Ok(value) => Ok(value),
            Err(std::env::VarError::NotPresent) => Err(Error::env_not_found(name)),
            Err(std::env::VarError::NotUnicode(_)) => Err(Error::interpolator_custom(
                "env",
                format!("environment variable '{}' is not valid unicode", name),
            )),
        }
    }
}

/// File contents interpolator (tag `FILE`)
///
/// Resolves `name` as a filesystem path and returns the decoded UTF-8
/// contents. Values are never re-typed (`parse_safe` is false): secret files
/// routinely contain text that coincidentally parses as YAML or JSON.
///
/// Contents are memoized per path for the lifetime of the instance, since the
/// common use is mounted secret files that do not change while the process
/// runs. Use [`invalidate`](Self::invalidate) or
/// [`clear_cache`](Self::clear_cache) to force a re-read, or resolve through a
/// fresh instance.
#[derive(Debug, Default)]
pub struct FileInterpolator {
    cache: RwLock<HashMap<PathBuf, String>>,
}

impl FileInterpolator {
    /// Create a new interpolator with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached contents for one path
    pub fn invalidate(&self, path: impl AsRef<Path>) {
        self.cache.write().unwrap().remove(path.as_ref());
    }

    /// Drop all cached contents
    pub fn clear_cache(&self) {
        self.cache.write().unwrap().clear();
    }
}

impl Interpolator for FileInterpolator {
    fn lookup(&self, name: &str) -> Result<String> {
        let path = PathBuf::from(name);

        if let Some(content) = self.cache.read().unwrap().get(&path) {
            log::trace!("file interpolator cache hit for {}", path.display());
            return Ok(content.clone());
        }

        if !path.exists() {
            return Err(Error::file_not_found(name));
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::io(format!("failed to read '{}': {}", name, e)))?;

        // Concurrent first reads may race here; both writers insert identical
        // content, so last-write-wins is fine.
        self.cache
            .write()
            .unwrap()
            .insert(path, content.clone());

        Ok(content)
    }

    fn parse_safe(&self) -> bool {
        false
    }
}

/// Docker-secret style interpolator (tag `DOCKER_SECRET`)
///
/// Resolves `name` by first checking the environment variable
/// `<NAME_UPPERCASED>_FILE`; when set, the value is the decoded contents of
/// the file it points at. Otherwise falls back to reading `name` directly as
/// an environment variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerSecretInterpolator;

impl DockerSecretInterpolator {
    /// Register this interpolator under the `DOCKER_SECRET` tag
    pub fn register_into(registry: &mut Registry, overwrite: bool) -> Result<()> {
        registry.register_default::<Self>("DOCKER_SECRET", overwrite)
    }
}

impl Interpolator for DockerSecretInterpolator {
    fn lookup(&self, name: &str) -> Result<String> {
        let file_var = format!("{}_FILE", name.to_uppercase());

        if let Ok(file_path) = std::env::var(&file_var) {
            // The env var points at the file holding the actual value
            return std::fs::read_to_string(&file_path).map_err(|e| {
                Error::io(format!(
                    "failed to read secret file '{}' (from {}): {}",
                    file_path, file_var, e
                ))
            });
        }

        EnvInterpolator.lookup(name)
    }
}

/// Namespace mapping TYPE tags to interpolator instances.
///
/// Tags are case-sensitive and unique; registering a duplicate without
/// `overwrite` fails. Isolated registries keep tests and multi-tenant use
/// from interfering through shared state.
#[derive(Clone, Default)]
pub struct Registry {
    interpolators: HashMap<String, Arc<dyn Interpolator>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the `ENV` and `FILE` built-ins
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("ENV", Arc::new(EnvInterpolator), false)
            .expect("empty registry cannot collide");
        registry
            .register("FILE", Arc::new(FileInterpolator::new()), false)
            .expect("empty registry cannot collide");
        registry
    }

    /// Register an interpolator instance under `tag`.
    ///
    /// Fails with an already-registered error when `tag` is taken and
    /// `overwrite` is false.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        interpolator: Arc<dyn Interpolator>,
        overwrite: bool,
    ) -> Result<()> {
        let tag = tag.into();
        if self.interpolators.contains_key(&tag) {
            if !overwrite {
                return Err(Error::already_registered(tag));
            }
            log::debug!("overwriting interpolator registration for '{}'", tag);
        }
        self.interpolators.insert(tag, interpolator);
        Ok(())
    }

    /// Register a default-constructed interpolator under `tag`.
    ///
    /// The instance is built once, at registration time.
    pub fn register_default<I>(&mut self, tag: impl Into<String>, overwrite: bool) -> Result<()>
    where
        I: Interpolator + Default + 'static,
    {
        self.register(tag, Arc::new(I::default()), overwrite)
    }

    /// Get the interpolator registered under `tag`
    pub fn get(&self, tag: &str) -> Option<&Arc<dyn Interpolator>> {
        self.interpolators.get(tag)
    }

    /// Check whether `tag` is registered
    pub fn contains(&self, tag: &str) -> bool {
        self.interpolators.contains_key(tag)
    }

    /// Number of registered interpolators
    pub fn len(&self) -> usize {
        self.interpolators.len()
    }

    /// Whether the registry has no registrations
    pub fn is_empty(&self) -> bool {
        self.interpolators.is_empty()
    }

    /// Remove all registrations (used mainly for test isolation)
    pub fn clear(&mut self) {
        self.interpolators.clear();
    }

    /// Read-only view of the current registrations
    pub fn interpolators(&self) -> &HashMap<String, Arc<dyn Interpolator>> {
        &self.interpolators
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&str> = self.interpolators.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("Registry").field("tags", &tags).finish()
    }
}

// Process-wide default registry for plugin crates and Config conveniences
static DEFAULT_REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();

/// Get the process-wide default registry.
///
/// Lazily initialized with the built-in interpolators. Plugin crates may
/// register additional interpolators here at startup; registration from
/// multiple threads without external ordering is a race, so serialize it
/// before spawning workers or use isolated registries.
pub fn default_registry() -> &'static RwLock<Registry> {
    DEFAULT_REGISTRY.get_or_init(|| RwLock::new(Registry::with_builtins()))
}

/// Register an interpolator in the process-wide default registry.
pub fn register_global(
    tag: impl Into<String>,
    interpolator: Arc<dyn Interpolator>,
    overwrite: bool,
) -> Result<()> {
    let mut registry = default_registry()
        .write()
        .expect("default registry lock poisoned");
    registry.register(tag, interpolator, overwrite)
}
