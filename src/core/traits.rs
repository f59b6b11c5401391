//! Interfaces of the collaborators a module is wired to
//!
//! The module owns none of these: it receives them at construction time and
//! talks to them only through the traits below.

use std::{fmt, sync::Arc};

use super::{
    context::{BeforeOutcome, Request},
    error::{ModuleError, ModuleResult},
};

/// Request processing events a dispatcher reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingEvent {
    Before,
    After,
    Invalid,
    Error,
}

impl ProcessingEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingEvent::Before => "before",
            ProcessingEvent::After => "after",
            ProcessingEvent::Invalid => "invalid",
            ProcessingEvent::Error => "error",
        }
    }
}

/// Resolves the target of a request, or stops its processing
pub type BeforeHandler = Arc<dyn Fn(&Request) -> BeforeOutcome + Send + Sync>;

/// Runs after the target method succeeded
pub type AfterHandler = Arc<dyn Fn() + Send + Sync>;

/// Receives the diagnostic of a request that cannot be processed
pub type InvalidHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Receives an execution fault, absorbing it or handing it back
pub type ErrorHandler = Arc<dyn Fn(ModuleError) -> ModuleResult<()> + Send + Sync>;

/// A handler for one processing event
#[derive(Clone)]
pub enum ProcessingHandler {
    Before(BeforeHandler),
    After(AfterHandler),
    Invalid(InvalidHandler),
    Error(ErrorHandler),
}

impl ProcessingHandler {
    pub fn event(&self) -> ProcessingEvent {
        match self {
            ProcessingHandler::Before(_) => ProcessingEvent::Before,
            ProcessingHandler::After(_) => ProcessingEvent::After,
            ProcessingHandler::Invalid(_) => ProcessingEvent::Invalid,
            ProcessingHandler::Error(_) => ProcessingEvent::Error,
        }
    }
}

impl fmt::Debug for ProcessingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessingHandler({})", self.event().as_str())
    }
}

/// Runs inbound requests through the registered processing handlers
pub trait Dispatcher: Send + Sync {
    /// Whether the request carries everything needed to be processed
    fn can_process_request(&self, request: &Request) -> bool;

    /// Register a handler, replacing the one registered for the same event
    fn register(&self, handler: ProcessingHandler);

    /// Process a request. Execution faults not absorbed by the error
    /// handler are returned.
    fn process_request(&self, request: &Request) -> ModuleResult<()>;
}

/// Fires named lifecycle events
pub trait EventBus: Send + Sync {
    fn trigger(&self, event: &str);
}

/// Produces the HTML and javascript a page includes
pub trait ScriptGenerator: Send + Sync {
    /// Application script, optionally preceded by the library tags
    fn script(&self, include_js: bool, include_css: bool) -> String;

    /// Tags including the library javascript files
    fn js(&self) -> String;

    /// Tags including the library CSS
    fn css(&self) -> String;
}
