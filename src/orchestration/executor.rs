//! Request side of the module: controller resolution and the processing
//! handlers handed to the dispatcher.

use std::sync::{Arc, PoisonError, Weak};

use log::{debug, warn};
use serde_json::Value as JsonValue;

use crate::{
    controller::Controller,
    core::{
        context::{BeforeOutcome, Flow, Request, RequestTarget},
        error::{ModuleError, ModuleResult},
        traits::ProcessingHandler,
    },
};

use super::lifecycle::{Module, ModuleSetup};

impl<S: ModuleSetup> Module<S> {
    /// Look up a controller, registering its class lazily, and make sure
    /// it is initialized.
    pub(super) fn resolve(&self, class_name: &str) -> Option<Arc<dyn Controller>> {
        let registry = &self.services.registry;
        let controller = match registry.get_registered_object(class_name) {
            Some(controller) => controller,
            None => match registry.register_class(class_name, JsonValue::Null, true) {
                Ok(controller) => controller?,
                Err(e) => {
                    warn!("Unable to register controller {}: {}", class_name, e);
                    return None;
                }
            },
        };
        self.initialize(&controller);
        Some(controller)
    }

    /// Attach the response, then run the init callback and the
    /// controller's own init. Does nothing for an initialized controller.
    pub(super) fn initialize(&self, controller: &Arc<dyn Controller>) {
        if !controller.state().attach(self.shared_response()) {
            return;
        }
        debug!("Initializing controller {}", controller.class_name());
        self.callbacks.run_init(controller);
        controller.init();
    }

    pub(super) fn on_event_before(&self, request: &Request) -> BeforeOutcome {
        let (Some(class_name), Some(method)) = (request.class.as_deref(), request.method.as_deref())
        else {
            return BeforeOutcome::Invalid("The request has no target".to_string());
        };

        let Some(validator) = self.validator.get() else {
            return BeforeOutcome::Invalid("The module is not set up".to_string());
        };
        if let Err(message) = validator.check(class_name, method) {
            return BeforeOutcome::Invalid(message);
        }

        let Some(controller) = self.resolve(class_name) else {
            return BeforeOutcome::Invalid(format!("Unable to find controller {class_name}"));
        };

        let response = self.shared_response();
        if self.callbacks.run_before(&response, &controller, method) == Flow::Abort {
            debug!("Before callback aborted {}.{}", class_name, method);
            return BeforeOutcome::Abort;
        }

        let target = RequestTarget {
            controller,
            method: method.to_string(),
        };
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(target.clone());
        BeforeOutcome::Proceed(target)
    }

    pub(super) fn on_event_after(&self) {
        let target = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(target) = target {
            let response = self.shared_response();
            self.callbacks
                .run_after(&response, &target.controller, &target.method);
        }
    }

    pub(super) fn on_event_invalid(&self, message: &str) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.callbacks.run_invalid(&self.shared_response(), message);
    }

    /// Hand an execution fault to the error callback, or return it when
    /// there is none
    pub(super) fn on_event_error(&self, fault: ModuleError) -> ModuleResult<()> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if self.callbacks.run_error(&self.shared_response(), &fault) {
            Ok(())
        } else {
            Err(fault)
        }
    }
}

impl<S: ModuleSetup + 'static> Module<S> {
    /// Point the dispatcher's handlers at this module.
    ///
    /// The handlers hold weak references, the module owns the dispatcher.
    pub(super) fn register_handlers(self: &Arc<Self>) {
        let dispatcher = &self.services.dispatcher;

        let module: Weak<Self> = Arc::downgrade(self);
        dispatcher.register(ProcessingHandler::Before(Arc::new(move |request: &Request| {
            match module.upgrade() {
                Some(module) => module.on_event_before(request),
                None => BeforeOutcome::Invalid("The module is gone".to_string()),
            }
        })));

        let module: Weak<Self> = Arc::downgrade(self);
        dispatcher.register(ProcessingHandler::After(Arc::new(move || {
            if let Some(module) = module.upgrade() {
                module.on_event_after();
            }
        })));

        let module: Weak<Self> = Arc::downgrade(self);
        dispatcher.register(ProcessingHandler::Invalid(Arc::new(move |message: &str| {
            if let Some(module) = module.upgrade() {
                module.on_event_invalid(message);
            }
        })));

        let module: Weak<Self> = Arc::downgrade(self);
        dispatcher.register(ProcessingHandler::Error(Arc::new(
            move |fault: ModuleError| -> ModuleResult<()> {
                match module.upgrade() {
                    Some(module) => module.on_event_error(fault),
                    None => Err(fault),
                }
            },
        )));
    }
}
