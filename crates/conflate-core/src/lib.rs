//! conflate-core: Configuration library with directive interpolation
//!
//! This crate provides the core functionality for loading and parsing
//! configuration files, and for resolving `<% TYPE[NAME] %>` directives
//! embedded in their string values against pluggable interpolators.
//!
//! # Example
//!
//! ```rust
//! use conflate_core::Config;
//!
//! let yaml = r#"
//! database:
//!   host: localhost
//!   port: <% ENV[DB_PORT, 5432] %>
//! "#;
//!
//! let config = Config::from_yaml(yaml).unwrap();
//! assert_eq!(config.get("database.host").unwrap().as_str(), Some("localhost"));
//! assert_eq!(config.get("database.port").unwrap().as_i64(), Some(5432));
//! ```

pub mod directive;
pub mod error;
pub mod interpolate;
pub mod loader;
pub mod process;
pub mod value;

mod config;

pub use config::Config;
pub use directive::{contains_directive, Directive};
pub use error::{Error, ErrorKind, InterpolateErrorKind, Result};
pub use interpolate::{
    default_registry, register_global, DockerSecretInterpolator, EnvInterpolator,
    FileInterpolator, Interpolator, Registry,
};
pub use loader::{JsonLoader, Loader};
pub use process::post_process;
pub use value::Value;

#[cfg(feature = "toml")]
pub use loader::TomlLoader;
#[cfg(feature = "yaml")]
pub use loader::YamlLoader;
