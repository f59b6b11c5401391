//! Default request dispatcher
//!
//! Runs one request through the registered processing handlers:
//! before (resolution), the target method, then after, or the invalid or
//! error branch.

use std::sync::{PoisonError, RwLock};

use log::{debug, warn};

use crate::core::{
    context::{BeforeOutcome, Request},
    error::ModuleResult,
    traits::{
        AfterHandler, BeforeHandler, Dispatcher, ErrorHandler, InvalidHandler, ProcessingHandler,
    },
};

#[derive(Default, Clone)]
struct Handlers {
    before: Option<BeforeHandler>,
    after: Option<AfterHandler>,
    invalid: Option<InvalidHandler>,
    error: Option<ErrorHandler>,
}

/// In-process dispatcher
#[derive(Default)]
pub struct RequestDispatcher {
    handlers: RwLock<Handlers>,
}

impl RequestDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn handlers(&self) -> Handlers {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn invalid(handlers: &Handlers, message: &str) {
        warn!("Invalid request: {}", message);
        if let Some(on_invalid) = &handlers.invalid {
            on_invalid(message);
        }
    }
}

impl Dispatcher for RequestDispatcher {
    fn can_process_request(&self, request: &Request) -> bool {
        request.is_callable()
    }

    fn register(&self, handler: ProcessingHandler) {
        debug!("Registering {} handler", handler.event().as_str());
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        match handler {
            ProcessingHandler::Before(h) => handlers.before = Some(h),
            ProcessingHandler::After(h) => handlers.after = Some(h),
            ProcessingHandler::Invalid(h) => handlers.invalid = Some(h),
            ProcessingHandler::Error(h) => handlers.error = Some(h),
        }
    }

    fn process_request(&self, request: &Request) -> ModuleResult<()> {
        let handlers = self.handlers();

        let Some(before) = &handlers.before else {
            Self::invalid(&handlers, "No request handler registered");
            return Ok(());
        };

        let target = match before(request) {
            BeforeOutcome::Proceed(target) => target,
            BeforeOutcome::Abort => {
                debug!("Request processing aborted");
                return Ok(());
            }
            BeforeOutcome::Invalid(message) => {
                Self::invalid(&handlers, &message);
                return Ok(());
            }
        };

        if !target.controller.methods().contains(&target.method.as_str()) {
            let message = format!(
                "Method {}.{} is not exported",
                target.controller.class_name(),
                target.method
            );
            Self::invalid(&handlers, &message);
            return Ok(());
        }

        debug!(
            "Calling {}.{}",
            target.controller.class_name(),
            target.method
        );
        match target.controller.call(&target.method, &request.args) {
            Ok(()) => {
                if let Some(after) = &handlers.after {
                    after();
                }
                Ok(())
            }
            Err(fault) => match &handlers.error {
                Some(on_error) => on_error(fault),
                None => Err(fault),
            },
        }
    }
}
