//! Lifecycle event bus

use std::sync::Arc;

use dashmap::DashMap;
use log::debug;

use crate::core::traits::EventBus;

/// Fired before anything else in module setup
pub const PRE_SETUP: &str = "pre.setup";
/// Fired once the module set its option defaults
pub const POST_CONFIG: &str = "post.config";
/// Fired before the module checks its setup
pub const PRE_CHECK: &str = "pre.check";
/// Fired when module setup is complete
pub const POST_SETUP: &str = "post.setup";

pub type EventListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Event bus delivering each event to all of its listeners, in
/// subscription order
#[derive(Default)]
pub struct EventRegistry {
    listeners: DashMap<String, Vec<EventListener>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, event: impl Into<String>, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.listeners
            .entry(event.into())
            .or_default()
            .push(Arc::new(listener));
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, |entry| entry.len())
    }
}

impl EventBus for EventRegistry {
    fn trigger(&self, event: &str) {
        // Listeners run without the map lock so they may subscribe in turn
        let listeners = self
            .listeners
            .get(event)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        debug!("Triggering event {} ({} listeners)", event, listeners.len());
        for listener in listeners {
            listener(event);
        }
    }
}
