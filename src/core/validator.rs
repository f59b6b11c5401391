//! Request name validation
//!
//! Class and method names come straight from the client. They are checked
//! here before anything is resolved, so untrusted input never reaches a
//! controller factory.

use std::{collections::HashSet, sync::Arc};

use once_cell::sync::Lazy;
use regex::Regex;

static CLASS_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:[.\\][A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("class name pattern is valid")
});

static METHOD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("method name pattern is valid"));

/// Predicates on raw class and method names
pub trait NameValidator: Send + Sync {
    fn validate_class(&self, name: &str) -> bool;

    fn validate_method(&self, name: &str) -> bool;
}

/// Identifier based name checks.
///
/// Class names are identifiers joined by `.` or `\`, method names are plain
/// identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternValidator;

impl NameValidator for PatternValidator {
    fn validate_class(&self, name: &str) -> bool {
        CLASS_NAME.is_match(name)
    }

    fn validate_method(&self, name: &str) -> bool {
        METHOD_NAME.is_match(name)
    }
}

/// Checks a requested class and method before resolution
#[derive(Clone)]
pub struct RequestValidator {
    names: Arc<dyn NameValidator>,
    protected: HashSet<String>,
}

impl RequestValidator {
    pub fn new(names: Arc<dyn NameValidator>, protected: impl IntoIterator<Item = String>) -> Self {
        Self {
            names,
            protected: protected.into_iter().collect(),
        }
    }

    /// Check a request, returning a diagnostic message on rejection
    pub fn check(&self, class_name: &str, method: &str) -> Result<(), String> {
        if !self.names.validate_class(class_name) {
            return Err(format!("Invalid class name: {class_name}"));
        }
        if !self.names.validate_method(method) {
            return Err(format!("Invalid method name: {method}"));
        }
        if self.protected.contains(method) {
            return Err(format!("Method {class_name}.{method} cannot be called"));
        }
        Ok(())
    }

    pub fn validate(&self, class_name: &str, method: &str) -> bool {
        self.check(class_name, method).is_ok()
    }

    pub fn protected(&self) -> &HashSet<String> {
        &self.protected
    }
}
