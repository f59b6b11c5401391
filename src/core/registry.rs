//! Controller class registry
//!
//! Known controller classes are registered as factories. Instances are
//! created on registration, recorded, and shared from then on. Class
//! directories group classes under a namespace and carry the list of method
//! names that must never be exported.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use dashmap::DashMap;
use log::{debug, info, warn};
use serde_json::Value as JsonValue;

use super::error::{ModuleError, ModuleResult};
use crate::controller::{Controller, ControllerFactory};

/// A directory of controller classes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDir {
    pub directory: String,
    pub namespace: String,
    pub separator: String,
    pub protected: Vec<String>,
}

impl ClassDir {
    /// Whether `class_name` belongs to this directory's namespace
    pub fn contains(&self, class_name: &str) -> bool {
        if self.namespace.is_empty() {
            return true;
        }
        class_name
            .strip_prefix(self.namespace.as_str())
            .is_some_and(|rest| !self.separator.is_empty() && rest.starts_with(&self.separator))
    }
}

/// Registry of controller classes and their instances
pub struct ClassRegistry {
    factories: DashMap<String, ControllerFactory>,
    objects: DashMap<String, Arc<dyn Controller>>,
    class_dirs: DashMap<String, ClassDir>,
    registration_calls: AtomicUsize,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
            objects: DashMap::new(),
            class_dirs: DashMap::new(),
            registration_calls: AtomicUsize::new(0),
        }
    }

    /// Make a controller class known to the registry
    pub fn register_factory(&self, class_name: impl Into<String>, factory: ControllerFactory) {
        let class_name = class_name.into();
        debug!("Adding controller factory: {}", class_name);
        self.factories.insert(class_name, factory);
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    /// Register a controller class and return its instance.
    ///
    /// An already registered class returns the recorded instance. With
    /// `lazy` set, an unknown class or a failing factory yields `Ok(None)`;
    /// an explicit registration reports them as errors.
    pub fn register_class(
        &self,
        class_name: &str,
        options: JsonValue,
        lazy: bool,
    ) -> ModuleResult<Option<Arc<dyn Controller>>> {
        self.registration_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(existing) = self.get_registered_object(class_name) {
            return Ok(Some(existing));
        }

        let Some(factory) = self.factories.get(class_name).map(|entry| entry.value().clone())
        else {
            if lazy {
                debug!("Unknown controller class: {}", class_name);
                return Ok(None);
            }
            return Err(ModuleError::NotFound(format!(
                "Controller class {class_name}"
            )));
        };

        let controller = match factory(options) {
            Ok(controller) => controller,
            Err(e) if lazy => {
                warn!("Unable to create controller {}: {}", class_name, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        // Another caller may have won the race, keep the first instance
        let controller = self
            .objects
            .entry(class_name.to_string())
            .or_insert(controller)
            .value()
            .clone();

        info!(
            "Registered controller class {}{}",
            class_name,
            if lazy { " (lazy)" } else { "" }
        );
        Ok(Some(controller))
    }

    /// Register every known class that belongs to a class directory.
    ///
    /// Returns the number of registered classes.
    pub fn register_classes(&self) -> ModuleResult<usize> {
        let names: Vec<String> = self
            .factories
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|name| self.class_dirs.iter().any(|dir| dir.contains(name)))
            .collect();

        info!("Registering {} controller classes", names.len());
        for name in &names {
            self.register_class(name, JsonValue::Null, false)?;
        }
        Ok(names.len())
    }

    /// Get a registered controller instance
    pub fn get_registered_object(&self, class_name: &str) -> Option<Arc<dyn Controller>> {
        self.objects.get(class_name).map(|entry| entry.value().clone())
    }

    /// All registered controller instances
    pub fn registered_objects(&self) -> Vec<Arc<dyn Controller>> {
        self.objects.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Add or replace a class directory
    pub fn add_class_dir(&self, dir: ClassDir) {
        info!(
            "Adding class directory {} (namespace '{}', {} protected methods)",
            dir.directory,
            dir.namespace,
            dir.protected.len()
        );
        self.class_dirs.insert(dir.directory.clone(), dir);
    }

    pub fn class_dirs(&self) -> Vec<ClassDir> {
        self.class_dirs.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Method names protected for a class by the directories it belongs to
    pub fn protected_methods(&self, class_name: &str) -> HashSet<String> {
        self.class_dirs
            .iter()
            .filter(|dir| dir.contains(class_name))
            .flat_map(|dir| dir.protected.clone())
            .collect()
    }

    pub fn is_protected(&self, class_name: &str, method: &str) -> bool {
        self.class_dirs
            .iter()
            .any(|dir| dir.contains(class_name) && dir.protected.iter().any(|p| p == method))
    }

    /// Number of `register_class` calls so far
    pub fn registration_calls(&self) -> usize {
        self.registration_calls.load(Ordering::SeqCst)
    }
}
