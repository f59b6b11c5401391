//! Unified error handling for the module layer
//!
//! Validation and resolution failures never surface here: they are routed to
//! the invalid hook. What remains are configuration faults, execution faults
//! raised by controllers or callbacks, and plumbing errors.

use std::fmt;

/// Unified error types for module setup and request dispatch
#[derive(Debug)]
pub enum ModuleError {
    /// Configuration-related errors (unreadable file, bad content, invalid options)
    Configuration(String),

    /// File system errors
    Io(std::io::Error),

    /// JSON decoding errors
    Json(serde_json::Error),

    /// YAML decoding errors
    Yaml(serde_yaml::Error),

    /// Option struct validation errors
    Validation(validator::ValidationErrors),

    /// Unknown controller class or method
    NotFound(String),

    /// Fault raised while running a controller method or a callback
    Execution(String),

    /// Template loading or rendering errors
    Template(String),

    /// Internal errors
    Internal(String),
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            ModuleError::Io(err) => write!(f, "I/O error: {err}"),
            ModuleError::Json(err) => write!(f, "JSON error: {err}"),
            ModuleError::Yaml(err) => write!(f, "YAML error: {err}"),
            ModuleError::Validation(err) => write!(f, "Validation error: {err}"),
            ModuleError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ModuleError::Execution(msg) => write!(f, "Execution error: {msg}"),
            ModuleError::Template(msg) => write!(f, "Template error: {msg}"),
            ModuleError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ModuleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModuleError::Io(err) => Some(err),
            ModuleError::Json(err) => Some(err),
            ModuleError::Yaml(err) => Some(err),
            ModuleError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ModuleError {
    fn from(err: std::io::Error) -> Self {
        ModuleError::Io(err)
    }
}

impl From<serde_json::Error> for ModuleError {
    fn from(err: serde_json::Error) -> Self {
        ModuleError::Json(err)
    }
}

impl From<serde_yaml::Error> for ModuleError {
    fn from(err: serde_yaml::Error) -> Self {
        ModuleError::Yaml(err)
    }
}

impl From<validator::ValidationErrors> for ModuleError {
    fn from(err: validator::ValidationErrors) -> Self {
        ModuleError::Validation(err)
    }
}

/// Result type alias for module operations
pub type ModuleResult<T> = std::result::Result<T, ModuleError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> ModuleResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> ModuleResult<T> {
        self.map_err(|e| ModuleError::Internal(format!("{context}: {e}")))
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::error::ModuleError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::ModuleError::Configuration(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! execution_error {
    ($msg:expr) => {
        $crate::core::error::ModuleError::Execution($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::ModuleError::Execution(format!($fmt, $($arg)*))
    };
}
