//! Service container
//!
//! Services are registered as factories under a name and created on first
//! use. The container also records which module is the active one.

use std::{any::Any, sync::Arc};

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use log::debug;
use serde_json::Value as JsonValue;

use crate::utils::template::Template;

pub const VIEW_SERVICE: &str = "jaxon.view";
pub const SESSION_SERVICE: &str = "jaxon.session";

/// Type-erased service instance
pub type Service = Arc<dyn Any + Send + Sync>;

/// Factory creating a service on first use
pub type ServiceFactory = Arc<dyn Fn(&ServiceContainer) -> Service + Send + Sync>;

/// Service locator shared by modules
pub struct ServiceContainer {
    factories: DashMap<String, ServiceFactory>,
    instances: DashMap<String, Service>,
    module: ArcSwapOption<String>,
}

impl ServiceContainer {
    /// Create a new empty container
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
            instances: DashMap::new(),
            module: ArcSwapOption::empty(),
        }
    }

    /// Register a service factory, dropping any instance created by a
    /// previous factory under the same name.
    pub fn set<T, F>(&self, name: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&ServiceContainer) -> T + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("Setting service factory: {}", name);
        let factory: ServiceFactory =
            Arc::new(move |container: &ServiceContainer| -> Service { Arc::new(factory(container)) });
        self.instances.remove(&name);
        self.factories.insert(name, factory);
    }

    /// Get a service, creating it on first use.
    ///
    /// Returns `None` when nothing is registered under `name` or when the
    /// registered service is not a `T`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        if let Some(instance) = self.instances.get(name).map(|entry| entry.value().clone()) {
            return instance.downcast::<T>().ok();
        }

        let factory = self.factories.get(name).map(|entry| entry.value().clone())?;
        // The factory may itself look up services, so it runs without any map lock held
        let created = factory(self);
        let instance = self
            .instances
            .entry(name.to_string())
            .or_insert(created)
            .value()
            .clone();
        instance.downcast::<T>().ok()
    }

    pub fn has(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn set_view<F>(&self, factory: F)
    where
        F: Fn(&ServiceContainer) -> Template + Send + Sync + 'static,
    {
        self.set(VIEW_SERVICE, factory);
    }

    pub fn view(&self) -> Option<Arc<Template>> {
        self.get(VIEW_SERVICE)
    }

    pub fn set_session<F>(&self, factory: F)
    where
        F: Fn(&ServiceContainer) -> Session + Send + Sync + 'static,
    {
        self.set(SESSION_SERVICE, factory);
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.get(SESSION_SERVICE)
    }

    /// Record the active module
    pub fn set_module(&self, name: &str) {
        debug!("Active module: {}", name);
        self.module.store(Some(Arc::new(name.to_string())));
    }

    /// Name of the active module, if one registered itself
    pub fn module_name(&self) -> Option<String> {
        self.module.load_full().map(|name| name.as_ref().clone())
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory session store
#[derive(Debug, Default)]
pub struct Session {
    values: DashMap<String, JsonValue>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.values.get(key).map(|entry| entry.value().clone())
    }

    pub fn set(&self, key: impl Into<String>, value: JsonValue) {
        self.values.insert(key.into(), value);
    }

    pub fn delete(&self, key: &str) -> Option<JsonValue> {
        self.values.remove(key).map(|(_, value)| value)
    }

    pub fn clear(&self) {
        self.values.clear();
    }
}
