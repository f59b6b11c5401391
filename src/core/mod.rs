//! Core abstractions of the module layer
//!
//! This module provides the error type, the shared registries and
//! containers, per-request types and the collaborator interfaces the
//! lifecycle coordinator is built on.

pub mod container;
pub mod context;
pub mod error;
pub mod registry;
pub mod response;
pub mod status;
pub mod traits;
pub mod validator;

// Re-export commonly used types
pub use container::{ServiceContainer, Session};
pub use context::{BeforeOutcome, Flow, Request, RequestTarget};
pub use error::{ModuleError, ModuleResult};
pub use registry::{ClassDir, ClassRegistry};
pub use response::Response;
pub use status::{SetupState, SetupStatus};
pub use traits::*;
pub use validator::{NameValidator, PatternValidator, RequestValidator};
