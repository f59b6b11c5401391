//! Controllers: the endpoint-bearing objects requests are dispatched to
//!
//! Rust has no runtime reflection, so a controller lists the methods it
//! exports and dispatches calls itself. The lifecycle methods of the trait are
//! never callable from a request: their names are part of the protected list
//! computed at module setup.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value as JsonValue;

use crate::core::{error::ModuleResult, response::Response};

/// Lifecycle methods shared by every controller.
pub const BASE_CONTROLLER_METHODS: &[&str] = &[
    "init",
    "call",
    "methods",
    "state",
    "response",
    "class_name",
    "request",
];

/// Endpoint-bearing object
pub trait Controller: Send + Sync {
    /// Name the controller is registered and requested under
    fn class_name(&self) -> &str;

    /// Per-instance lifecycle state
    fn state(&self) -> &ControllerState;

    /// Methods callable from a request
    fn methods(&self) -> &[&'static str];

    /// Run one of the exported methods
    fn call(&self, method: &str, args: &[JsonValue]) -> ModuleResult<()>;

    /// Called once, after the response is attached and the init callback ran
    fn init(&self) {}

    /// The response attached at initialization
    fn response(&self) -> Option<Arc<Response>> {
        self.state().response()
    }
}

/// Factory creating a controller from its registration options
pub type ControllerFactory =
    Arc<dyn Fn(JsonValue) -> ModuleResult<Arc<dyn Controller>> + Send + Sync>;

/// Lifecycle state embedded in every controller.
///
/// The attached response doubles as the "already initialized" marker and
/// can only ever be set once.
#[derive(Debug, Default)]
pub struct ControllerState {
    response: OnceCell<Arc<Response>>,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the shared response. Returns false if one was already attached.
    pub fn attach(&self, response: Arc<Response>) -> bool {
        self.response.set(response).is_ok()
    }

    pub fn response(&self) -> Option<Arc<Response>> {
        self.response.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.response.get().is_some()
    }
}

/// Builds client side calls to a controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestFactory {
    js_class: String,
}

impl RequestFactory {
    pub fn new(js_class: impl Into<String>) -> Self {
        Self {
            js_class: js_class.into(),
        }
    }

    pub fn js_class(&self) -> &str {
        &self.js_class
    }

    /// Javascript expression calling `method` with JSON encoded `args`
    pub fn call(&self, method: &str, args: &[JsonValue]) -> String {
        let args = args
            .iter()
            .map(JsonValue::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}.{}({})", self.js_class, method, args)
    }
}
