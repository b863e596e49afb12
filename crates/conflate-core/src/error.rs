//! Error types for conflate
//!
//! Errors are structured: a kind, optional config-path context, and an
//! actionable help message. Interpolation errors carry the dotted path of the
//! leaf that was being resolved when the failure occurred.

use std::fmt;

/// Result type alias for conflate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for conflate operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Path in the config where the error occurred (e.g., "database.port")
    pub path: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Error parsing YAML/JSON/TOML input
    Parse,
    /// Error during directive interpolation
    Interpolate(InterpolateErrorKind),
    /// A key lookup on a config or value missed
    KeyNotFound,
    /// Type coercion failed
    TypeCoercion,
    /// I/O error other than not-found
    Io,
    /// Internal error (bug in conflate)
    Internal,
}

/// Specific interpolation error categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpolateErrorKind {
    /// The interpolator could not find the requested resource and no default
    /// was provided. Not-found kinds are the only ones eligible for default
    /// fallback.
    NotFound { resource: String },
    /// Environment variable not set
    EnvNotFound { var_name: String },
    /// File does not exist
    FileNotFound { path: String },
    /// Directive names a type tag with no registered interpolator
    UnknownInterpolator { tag: String },
    /// Registration collision without overwrite
    AlreadyRegistered { tag: String },
    /// The directive resolution loop did not reach a fixpoint
    NoFixpoint { passes: usize },
    /// An interpolator failed in a non-not-found way
    Custom { interpolator: String, message: String },
}

impl Error {
    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            path: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create a key not found error
    pub fn key_not_found(key: impl Into<String>) -> Self {
        let key_str = key.into();
        Self {
            kind: ErrorKind::KeyNotFound,
            path: Some(key_str.clone()),
            help: Some(format!(
                "Check that '{}' exists in the configuration",
                key_str
            )),
            cause: None,
        }
    }

    /// Create a generic not-found error (eligible for default fallback)
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Interpolate(InterpolateErrorKind::NotFound {
                resource: resource.into(),
            }),
            path: None,
            help: None,
            cause: None,
        }
    }

    /// Create an env var not found error
    pub fn env_not_found(var_name: impl Into<String>) -> Self {
        let var = var_name.into();
        Self {
            kind: ErrorKind::Interpolate(InterpolateErrorKind::EnvNotFound {
                var_name: var.clone(),
            }),
            path: None,
            help: Some(format!(
                "Set the {} environment variable or provide a default: <% ENV[{}, default] %>",
                var, var
            )),
            cause: None,
        }
    }

    /// Create a file not found error
    pub fn file_not_found(file_path: impl Into<String>) -> Self {
        let fp = file_path.into();
        Self {
            kind: ErrorKind::Interpolate(InterpolateErrorKind::FileNotFound { path: fp }),
            path: None,
            help: Some("Check that the file exists and is readable".into()),
            cause: None,
        }
    }

    /// Create an unrecognized interpolator type error
    pub fn unknown_interpolator(tag: impl Into<String>) -> Self {
        let t = tag.into();
        Self {
            kind: ErrorKind::Interpolate(InterpolateErrorKind::UnknownInterpolator {
                tag: t.clone(),
            }),
            path: None,
            help: Some(format!(
                "Register the '{}' interpolator or check for typos",
                t
            )),
            cause: None,
        }
    }

    /// Create an interpolator already registered error
    pub fn already_registered(tag: impl Into<String>) -> Self {
        let t = tag.into();
        Self {
            kind: ErrorKind::Interpolate(InterpolateErrorKind::AlreadyRegistered {
                tag: t.clone(),
            }),
            path: None,
            help: Some(format!(
                "Pass overwrite=true to replace the '{}' interpolator",
                t
            )),
            cause: None,
        }
    }

    /// Create a no-fixpoint error for a runaway resolution loop
    pub fn no_fixpoint(passes: usize) -> Self {
        Self {
            kind: ErrorKind::Interpolate(InterpolateErrorKind::NoFixpoint { passes }),
            path: None,
            help: Some(
                "A resolved value keeps producing new directives. Check for a self-referential default"
                    .into(),
            ),
            cause: None,
        }
    }

    /// Create a custom interpolator error
    pub fn interpolator_custom(
        interpolator: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let name = interpolator.into();
        Self {
            kind: ErrorKind::Interpolate(InterpolateErrorKind::Custom {
                interpolator: name.clone(),
                message: message.into(),
            }),
            path: None,
            help: Some(format!("Check the '{}' interpolator configuration", name)),
            cause: None,
        }
    }

    /// Create a type coercion error
    pub fn type_coercion(
        path: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::TypeCoercion,
            path: Some(path.into()),
            help: Some(format!(
                "Ensure the value can be converted to {}",
                expected.into()
            )),
            cause: Some(format!("Got: {}", got.into())),
        }
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Io,
            path: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an internal error (bug in conflate)
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            path: None,
            help: Some("This is likely a bug in conflate. Please report it.".into()),
            cause: Some(message.into()),
        }
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Whether this error represents a missing value that a directive default
    /// may substitute for.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Interpolate(
                InterpolateErrorKind::NotFound { .. }
                    | InterpolateErrorKind::EnvNotFound { .. }
                    | InterpolateErrorKind::FileNotFound { .. }
            )
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Parse => write!(f, "Parse error")?,
            ErrorKind::Interpolate(i) => match i {
                InterpolateErrorKind::NotFound { resource } => {
                    write!(f, "Value not found: {}", resource)?
                }
                InterpolateErrorKind::EnvNotFound { var_name } => {
                    write!(f, "Environment variable not found: {}", var_name)?
                }
                InterpolateErrorKind::FileNotFound { path } => {
                    write!(f, "File not found: {}", path)?
                }
                InterpolateErrorKind::UnknownInterpolator { tag } => {
                    write!(f, "Unrecognized interpolator type: {}", tag)?
                }
                InterpolateErrorKind::AlreadyRegistered { tag } => {
                    write!(f, "Interpolator '{}' is already registered", tag)?
                }
                InterpolateErrorKind::NoFixpoint { passes } => {
                    write!(f, "Interpolation did not settle after {} passes", passes)?
                }
                InterpolateErrorKind::Custom {
                    interpolator,
                    message,
                } => write!(f, "Interpolator '{}' error: {}", interpolator, message)?,
            },
            ErrorKind::KeyNotFound => write!(f, "Key not found")?,
            ErrorKind::TypeCoercion => write!(f, "Type coercion failed")?,
            ErrorKind::Io => write!(f, "I/O error")?,
            ErrorKind::Internal => write!(f, "Internal error")?,
        }

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
