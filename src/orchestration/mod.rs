//! Module orchestration layer
//!
//! `Module` coordinates the option stores, the class registry, the
//! container, the dispatcher and the event bus. Collaborators are passed in
//! through `ModuleServices`, so none of them refers back to the module.

pub mod callbacks;
pub mod events;
mod executor;
pub mod lifecycle;
pub mod router;

pub use callbacks::Callbacks;
pub use events::EventRegistry;
pub use lifecycle::{DefaultModule, Module, ModuleConfig, ModuleServices, ModuleSetup};
pub use router::RequestDispatcher;

#[cfg(test)]
mod tests;
