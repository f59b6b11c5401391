//! Template engine used as the view service
//!
//! Templates are plain files with `{{ var }}` placeholders, looked up in
//! named namespaces. `render("ns::name", vars)` reads `dir/name` plus the
//! namespace extension.

use std::{fs, path::PathBuf, sync::Arc};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;

use crate::core::error::{ModuleError, ModuleResult};

/// Namespace of the library's own templates
pub const LIBRARY_NAMESPACE: &str = "jaxon";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\s*\}\}")
        .expect("placeholder pattern is valid")
});

#[derive(Clone, Debug, PartialEq, Eq)]
struct Namespace {
    directory: PathBuf,
    extension: String,
}

pub struct Template {
    namespaces: DashMap<String, Namespace>,
    default_namespace: ArcSwap<String>,
}

impl Template {
    /// Create an engine with the library namespace pointing at `template_dir`
    pub fn new(template_dir: &str) -> Self {
        let template = Self {
            namespaces: DashMap::new(),
            default_namespace: ArcSwap::from_pointee(String::new()),
        };
        let directory = template_dir.trim().trim_end_matches(['/', '\\']);
        template.add_namespace(LIBRARY_NAMESPACE, directory, ".tpl", false);
        template
    }

    /// Add or replace a namespace. The library namespace is never replaced.
    pub fn add_namespace(&self, namespace: &str, directory: &str, extension: &str, is_default: bool) {
        if namespace == LIBRARY_NAMESPACE && self.namespaces.contains_key(namespace) {
            debug!("Namespace {} cannot be redefined", namespace);
            return;
        }
        self.namespaces.insert(
            namespace.to_string(),
            Namespace {
                directory: PathBuf::from(directory),
                extension: extension.to_string(),
            },
        );
        if is_default {
            self.default_namespace.store(Arc::new(namespace.to_string()));
        }
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    pub fn default_namespace(&self) -> String {
        self.default_namespace.load().as_ref().clone()
    }

    /// Render a template.
    ///
    /// Returns `Ok(None)` when the namespace is not defined.
    pub fn render(&self, template: &str, vars: &JsonValue) -> ModuleResult<Option<String>> {
        let (namespace, name) = match template.split_once("::") {
            Some((namespace, name)) => (namespace.trim().to_string(), name),
            None => (String::new(), template),
        };
        let namespace = if namespace.is_empty() {
            self.default_namespace()
        } else {
            namespace
        };

        let Some(entry) = self.namespaces.get(&namespace).map(|e| e.value().clone()) else {
            debug!("Template namespace '{}' is not defined", namespace);
            return Ok(None);
        };

        let path = entry
            .directory
            .join(format!("{}{}", name.trim(), entry.extension));
        trace!("Rendering template {}", path.display());
        let content = fs::read_to_string(&path).map_err(|e| {
            ModuleError::Template(format!("Unable to read template {}: {}", path.display(), e))
        })?;

        Ok(Some(substitute(&content, vars)))
    }
}

/// Replace placeholders with values from `vars`. Unknown names render empty.
fn substitute(content: &str, vars: &JsonValue) -> String {
    PLACEHOLDER
        .replace_all(content, |caps: &Captures| {
            let value = caps[1]
                .split('.')
                .try_fold(vars, |node, segment| node.get(segment));
            match value {
                Some(JsonValue::String(s)) => s.clone(),
                Some(JsonValue::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        })
        .into_owned()
}
