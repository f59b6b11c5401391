//! Lifecycle callback slots
//!
//! Each hook holds at most one callback. Registering a callback replaces
//! the previous one.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::{
    controller::Controller,
    core::{context::Flow, error::ModuleError, response::Response},
};

type InitFn = dyn Fn(&Arc<dyn Controller>) + Send + Sync;
type BeforeFn = dyn Fn(&Response, &Arc<dyn Controller>, &str) -> Flow + Send + Sync;
type AfterFn = dyn Fn(&Response, &Arc<dyn Controller>, &str) + Send + Sync;
type InvalidFn = dyn Fn(&Response, &str) + Send + Sync;
type ErrorFn = dyn Fn(&Response, &ModuleError) + Send + Sync;

/// Sized wrapper so callbacks fit in an `ArcSwapOption`
struct Callback<F: ?Sized>(Box<F>);

/// The five hook slots of a module
pub struct Callbacks {
    init: ArcSwapOption<Callback<InitFn>>,
    before: ArcSwapOption<Callback<BeforeFn>>,
    after: ArcSwapOption<Callback<AfterFn>>,
    invalid: ArcSwapOption<Callback<InvalidFn>>,
    error: ArcSwapOption<Callback<ErrorFn>>,
}

impl Default for Callbacks {
    fn default() -> Self {
        Self::new()
    }
}

impl Callbacks {
    pub fn new() -> Self {
        Self {
            init: ArcSwapOption::empty(),
            before: ArcSwapOption::empty(),
            after: ArcSwapOption::empty(),
            invalid: ArcSwapOption::empty(),
            error: ArcSwapOption::empty(),
        }
    }

    /// Set the callback run when a controller is initialized
    pub fn on_init<F>(&self, callback: F)
    where
        F: Fn(&Arc<dyn Controller>) + Send + Sync + 'static,
    {
        let callback: Box<InitFn> = Box::new(callback);
        self.init.store(Some(Arc::new(Callback(callback))));
    }

    /// Set the callback run before the target method. Returning
    /// `Flow::Abort` prevents the method from running.
    pub fn on_before<F>(&self, callback: F)
    where
        F: Fn(&Response, &Arc<dyn Controller>, &str) -> Flow + Send + Sync + 'static,
    {
        let callback: Box<BeforeFn> = Box::new(callback);
        self.before.store(Some(Arc::new(Callback(callback))));
    }

    /// Set the callback run after the target method
    pub fn on_after<F>(&self, callback: F)
    where
        F: Fn(&Response, &Arc<dyn Controller>, &str) + Send + Sync + 'static,
    {
        let callback: Box<AfterFn> = Box::new(callback);
        self.after.store(Some(Arc::new(Callback(callback))));
    }

    /// Set the callback run for requests that cannot be processed
    pub fn on_invalid<F>(&self, callback: F)
    where
        F: Fn(&Response, &str) + Send + Sync + 'static,
    {
        let callback: Box<InvalidFn> = Box::new(callback);
        self.invalid.store(Some(Arc::new(Callback(callback))));
    }

    /// Set the callback absorbing execution faults
    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(&Response, &ModuleError) + Send + Sync + 'static,
    {
        let callback: Box<ErrorFn> = Box::new(callback);
        self.error.store(Some(Arc::new(Callback(callback))));
    }

    pub(crate) fn run_init(&self, controller: &Arc<dyn Controller>) {
        if let Some(callback) = self.init.load_full() {
            (callback.0)(controller);
        }
    }

    pub(crate) fn run_before(
        &self,
        response: &Response,
        controller: &Arc<dyn Controller>,
        method: &str,
    ) -> Flow {
        match self.before.load_full() {
            Some(callback) => (callback.0)(response, controller, method),
            None => Flow::Continue,
        }
    }

    pub(crate) fn run_after(
        &self,
        response: &Response,
        controller: &Arc<dyn Controller>,
        method: &str,
    ) {
        if let Some(callback) = self.after.load_full() {
            (callback.0)(response, controller, method);
        }
    }

    pub(crate) fn run_invalid(&self, response: &Response, message: &str) {
        if let Some(callback) = self.invalid.load_full() {
            (callback.0)(response, message);
        }
    }

    /// Returns false when no error callback is registered
    pub(crate) fn run_error(&self, response: &Response, fault: &ModuleError) -> bool {
        match self.error.load_full() {
            Some(callback) => {
                (callback.0)(response, fault);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::controller::testing::DemoController;

    #[test]
    fn test_last_registration_wins() {
        let callbacks = Callbacks::new();
        let response = Response::new();

        callbacks.on_invalid(|response, _| response.alert("first"));
        callbacks.on_invalid(|response, _| response.alert("second"));
        callbacks.run_invalid(&response, "bad request");

        let commands = response.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].data["message"], "second");
    }

    #[test]
    fn test_empty_slots() {
        let callbacks = Callbacks::new();
        let response = Response::new();
        let controller: Arc<dyn Controller> = Arc::new(DemoController::new("Demo"));

        callbacks.run_init(&controller);
        assert_eq!(callbacks.run_before(&response, &controller, "hello"), Flow::Continue);
        callbacks.run_after(&response, &controller, "hello");
        assert!(!callbacks.run_error(&response, &ModuleError::Execution("x".to_string())));
        assert!(response.is_empty());
    }

    #[test]
    fn test_before_can_abort() {
        let callbacks = Callbacks::new();
        let response = Response::new();
        let controller: Arc<dyn Controller> = Arc::new(DemoController::new("Demo"));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        callbacks.on_before(move |_, _, method| {
            counter.fetch_add(1, Ordering::SeqCst);
            if method == "hello" {
                Flow::Abort
            } else {
                Flow::Continue
            }
        });

        assert_eq!(callbacks.run_before(&response, &controller, "hello"), Flow::Abort);
        assert_eq!(callbacks.run_before(&response, &controller, "other"), Flow::Continue);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
