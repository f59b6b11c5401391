//! Per-request state
//!
//! `Request` carries the inbound fields naming the target endpoint,
//! `RequestTarget` is the descriptor a successful before-hook produces.

use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::Value as JsonValue;

use crate::controller::Controller;

/// Request parameter naming the target controller class
pub const CLASS_PARAM: &str = "jxncls";
/// Request parameter naming the target method
pub const METHOD_PARAM: &str = "jxnmthd";
/// Request parameter carrying the JSON encoded argument list
pub const ARGS_PARAM: &str = "jxnargs";

/// Inbound request, as read from the transport layer
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Request {
    pub class: Option<String>,
    pub method: Option<String>,
    pub args: Vec<JsonValue>,
}

impl Request {
    /// Create a request targeting `class.method`
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            method: Some(method.into()),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<JsonValue>) -> Self {
        self.args = args;
        self
    }

    /// Build a request from raw request parameters.
    ///
    /// Arguments that are not a JSON array are ignored, the request still
    /// goes through validation on its class and method.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let args = params
            .get(ARGS_PARAM)
            .and_then(|raw| serde_json::from_str::<Vec<JsonValue>>(raw).ok())
            .unwrap_or_default();

        Self {
            class: params.get(CLASS_PARAM).cloned(),
            method: params.get(METHOD_PARAM).cloned(),
            args,
        }
    }

    /// Whether both markers of a callable request are present
    pub fn is_callable(&self) -> bool {
        self.class.is_some() && self.method.is_some()
    }
}

/// Controller and method selected for the current request
#[derive(Clone)]
pub struct RequestTarget {
    pub controller: Arc<dyn Controller>,
    pub method: String,
}

impl fmt::Debug for RequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTarget")
            .field("controller", &self.controller.class_name())
            .field("method", &self.method)
            .finish()
    }
}

/// What a before-callback decides
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Flow {
    #[default]
    Continue,
    Abort,
}

/// Result of before-processing, consumed by the dispatcher
#[derive(Debug)]
pub enum BeforeOutcome {
    /// Run the target method
    Proceed(RequestTarget),
    /// Stop here, the response is returned as it is
    Abort,
    /// The request names an endpoint that cannot be called
    Invalid(String),
}
