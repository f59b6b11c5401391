//! Module lifecycle management
//!
//! A `Module` wires the option stores, the class registry, the container,
//! the dispatcher and the event bus together. Its setup runs exactly once,
//! on the first operation that needs it, and always in the same order.

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use serde_json::Value as JsonValue;
use validator::Validate;

use crate::{
    config::{
        ApplicationOptions, LibraryOptions, Options, CLASS_PREFIX, CONTROLLERS_DIRECTORY,
        CONTROLLERS_NAMESPACE, CONTROLLERS_PROTECTED, CONTROLLERS_SEPARATOR,
        DEFAULT_CLASS_PREFIX, DEFAULT_REQUEST_URI, JS_APP_DIR, JS_APP_EXTERN, JS_APP_MINIFY,
        JS_APP_URI, REQUEST_URI,
    },
    controller::{Controller, RequestFactory, BASE_CONTROLLER_METHODS},
    core::{
        container::{ServiceContainer, Session},
        context::{Flow, Request, RequestTarget},
        error::{ModuleError, ModuleResult},
        registry::{ClassDir, ClassRegistry},
        response::Response,
        status::{SetupState, SetupStatus},
        traits::{Dispatcher, EventBus, ScriptGenerator},
        validator::{NameValidator, PatternValidator, RequestValidator},
    },
    utils::{script::DefaultScripts, template::Template},
};

use super::{
    callbacks::Callbacks,
    events::{self, EventRegistry},
    router::RequestDispatcher,
};

/// Module specific part of the setup.
pub trait ModuleSetup: Send + Sync {
    /// Name the module registers itself under
    fn name(&self) -> &str;

    /// Provide the module's library and application defaults
    fn setup(&self, config: &mut ModuleConfig<'_>) -> ModuleResult<()>;

    /// Check the module's configuration once defaults are merged
    fn check(&self, _config: &ModuleConfig<'_>) -> ModuleResult<()> {
        Ok(())
    }

    /// Controller method names that are never exported
    fn base_controller_methods(&self) -> &[&str] {
        BASE_CONTROLLER_METHODS
    }

    /// The bare base module does not register itself in the container
    fn is_base_module(&self) -> bool {
        false
    }
}

/// Setup hooks of the bare base module
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultModule;

impl ModuleSetup for DefaultModule {
    fn name(&self) -> &str {
        "default"
    }

    fn setup(&self, _config: &mut ModuleConfig<'_>) -> ModuleResult<()> {
        Ok(())
    }

    fn is_base_module(&self) -> bool {
        true
    }
}

/// What a module sees of its configuration during setup
pub struct ModuleConfig<'a> {
    options: &'a Options,
    app_config: &'a Options,
    library: Option<LibraryOptions>,
    application: Option<ApplicationOptions>,
}

impl<'a> ModuleConfig<'a> {
    fn new(options: &'a Options, app_config: &'a Options) -> Self {
        Self {
            options,
            app_config,
            library: None,
            application: None,
        }
    }

    pub fn set_library_options(&mut self, library: LibraryOptions) -> ModuleResult<()> {
        library.validate()?;
        self.library = Some(library);
        Ok(())
    }

    pub fn set_application_options(&mut self, application: ApplicationOptions) -> ModuleResult<()> {
        application.validate()?;
        self.application = Some(application);
        Ok(())
    }

    pub fn library_options(&self) -> Option<&LibraryOptions> {
        self.library.as_ref()
    }

    pub fn application_options(&self) -> Option<&ApplicationOptions> {
        self.application.as_ref()
    }

    /// Library scope options
    pub fn options(&self) -> &Options {
        self.options
    }

    /// Application scope options
    pub fn app_config(&self) -> &Options {
        self.app_config
    }
}

/// Collaborators a module is built with
#[derive(Clone)]
pub struct ModuleServices {
    pub options: Arc<Options>,
    pub registry: Arc<ClassRegistry>,
    pub container: Arc<ServiceContainer>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub events: Arc<dyn EventBus>,
    pub scripts: Arc<dyn ScriptGenerator>,
}

impl ModuleServices {
    /// In-process collaborators sharing one option store and registry
    pub fn new() -> Self {
        let options = Arc::new(Options::new());
        let registry = Arc::new(ClassRegistry::new());
        Self {
            scripts: Arc::new(DefaultScripts::new(options.clone(), registry.clone())),
            options,
            registry,
            container: Arc::new(ServiceContainer::new()),
            dispatcher: Arc::new(RequestDispatcher::new()),
            events: Arc::new(EventRegistry::new()),
        }
    }
}

impl Default for ModuleServices {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle coordinator of one module
pub struct Module<S: ModuleSetup> {
    pub(super) hooks: S,
    pub(super) services: ModuleServices,
    pub(super) app_config: Options,
    status: SetupStatus,
    setup_lock: Mutex<()>,
    pub(super) response: OnceCell<Arc<Response>>,
    names: Arc<dyn NameValidator>,
    pub(super) validator: OnceCell<RequestValidator>,
    pub(super) callbacks: Callbacks,
    pub(super) active: Mutex<Option<RequestTarget>>,
}

impl<S: ModuleSetup> Module<S> {
    pub fn new(hooks: S, services: ModuleServices) -> Self {
        Self {
            hooks,
            services,
            app_config: Options::new(),
            status: SetupStatus::new(),
            setup_lock: Mutex::new(()),
            response: OnceCell::new(),
            names: Arc::new(PatternValidator),
            validator: OnceCell::new(),
            callbacks: Callbacks::new(),
            active: Mutex::new(None),
        }
    }

    /// Use an application option store loaded beforehand
    pub fn with_app_config(mut self, app_config: Options) -> Self {
        self.app_config = app_config;
        self
    }

    /// Replace the class and method name checks
    pub fn with_name_validator(mut self, names: Arc<dyn NameValidator>) -> Self {
        self.names = names;
        self
    }

    pub fn hooks(&self) -> &S {
        &self.hooks
    }

    pub fn services(&self) -> &ModuleServices {
        &self.services
    }

    /// Library scope options
    pub fn options(&self) -> &Options {
        &self.services.options
    }

    /// Application scope options
    pub fn app_config(&self) -> &Options {
        &self.app_config
    }

    pub fn setup_state(&self) -> SetupState {
        self.status.get()
    }

    pub fn is_setup(&self) -> bool {
        self.status.is_ready()
    }

    /// The response shared with controllers, available once set up
    pub fn response(&self) -> Option<Arc<Response>> {
        self.response.get().cloned()
    }

    pub(super) fn shared_response(&self) -> Arc<Response> {
        self.response
            .get_or_init(|| Arc::new(Response::new()))
            .clone()
    }

    /// Run the setup sequence unless it already completed.
    ///
    /// A failed setup is reported to the caller and will run again on the
    /// next call.
    pub fn setup(&self) -> ModuleResult<()> {
        if self.status.is_ready() {
            return Ok(());
        }

        let _guard = self.setup_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.status.is_ready() {
            return Ok(());
        }

        self.status.set(SetupState::SettingUp);
        match self.run_setup() {
            Ok(()) => {
                self.status.set(SetupState::Ready);
                info!("Module {} is set up", self.hooks.name());
                Ok(())
            }
            Err(e) => {
                self.status.set(SetupState::Uninitialized);
                warn!("Setup of module {} failed: {}", self.hooks.name(), e);
                Err(e)
            }
        }
    }

    fn run_setup(&self) -> ModuleResult<()> {
        let services = &self.services;

        if !self.hooks.is_base_module() {
            services.container.set_module(self.hooks.name());
        }

        services.events.trigger(events::PRE_SETUP);

        let mut config = ModuleConfig::new(&services.options, &self.app_config);
        self.hooks.setup(&mut config)?;

        services.events.trigger(events::POST_CONFIG);

        self.shared_response();

        if let (Some(library), Some(application)) = (&config.library, &config.application) {
            self.merge_defaults(library, application);
        }

        services.events.trigger(events::PRE_CHECK);

        self.hooks.check(&config)?;

        let protected = self.protected_methods();
        match self.app_config.get(CONTROLLERS_DIRECTORY) {
            Some(JsonValue::String(directory)) => {
                services.registry.add_class_dir(ClassDir {
                    directory,
                    namespace: self.app_config.get_str(CONTROLLERS_NAMESPACE, ""),
                    separator: self.app_config.get_str(CONTROLLERS_SEPARATOR, "."),
                    protected: protected.clone(),
                });
            }
            _ => debug!("No controller directory configured for {}", self.hooks.name()),
        }
        // A previous, failed setup may have got this far already
        let _ = self
            .validator
            .set(RequestValidator::new(self.names.clone(), protected));

        services.events.trigger(events::POST_SETUP);
        Ok(())
    }

    fn merge_defaults(&self, library: &LibraryOptions, application: &ApplicationOptions) {
        let options = &self.services.options;
        options.set_option(JS_APP_EXTERN, JsonValue::Bool(library.external));
        options.set_option(JS_APP_MINIFY, JsonValue::Bool(library.minify));
        options.set_option(JS_APP_URI, JsonValue::String(library.uri.clone()));
        options.set_option(JS_APP_DIR, JsonValue::String(library.dir.clone()));

        self.app_config.set_option(
            CONTROLLERS_DIRECTORY,
            JsonValue::String(application.directory.clone()),
        );
        self.app_config.set_option(
            CONTROLLERS_NAMESPACE,
            JsonValue::String(application.namespace.clone()),
        );

        options.set_option(REQUEST_URI, JsonValue::from(DEFAULT_REQUEST_URI));
    }

    /// Configured protected methods followed by the base controller methods
    fn protected_methods(&self) -> Vec<String> {
        let mut protected = self.app_config.get_string_list(CONTROLLERS_PROTECTED);
        for method in self.hooks.base_controller_methods() {
            if !protected.iter().any(|p| p == method) {
                protected.push(method.to_string());
            }
        }
        protected
    }

    /// Register the controller classes of the configured directories
    pub fn register(&self) -> ModuleResult<usize> {
        self.setup()?;
        self.services.registry.register_classes()
    }

    /// Explicitly register a controller class
    pub fn register_class(
        &self,
        class_name: &str,
        options: JsonValue,
    ) -> ModuleResult<Arc<dyn Controller>> {
        self.setup()?;
        self.services
            .registry
            .register_class(class_name, options, false)?
            .ok_or_else(|| ModuleError::NotFound(format!("Controller class {class_name}")))
    }

    /// Application script, optionally preceded by the library tags
    pub fn script(&self, include_js: bool, include_css: bool) -> ModuleResult<String> {
        self.setup()?;
        Ok(self.services.scripts.script(include_js, include_css))
    }

    pub fn js(&self) -> ModuleResult<String> {
        self.setup()?;
        Ok(self.services.scripts.js())
    }

    pub fn css(&self) -> ModuleResult<String> {
        self.setup()?;
        Ok(self.services.scripts.css())
    }

    /// Get an initialized controller, registering its class if needed.
    ///
    /// `Ok(None)` means no such controller exists.
    pub fn controller(&self, class_name: &str) -> ModuleResult<Option<Arc<dyn Controller>>> {
        self.setup()?;
        Ok(self.resolve(class_name))
    }

    /// Get a factory for client side calls to a controller
    pub fn request(&self, class_name: &str) -> ModuleResult<Option<RequestFactory>> {
        let Some(controller) = self.controller(class_name)? else {
            return Ok(None);
        };
        let prefix = self.services.options.get_str(CLASS_PREFIX, DEFAULT_CLASS_PREFIX);
        Ok(Some(RequestFactory::new(format!(
            "{prefix}{}",
            controller.class_name()
        ))))
    }

    pub fn on_init<F>(&self, callback: F)
    where
        F: Fn(&Arc<dyn Controller>) + Send + Sync + 'static,
    {
        self.callbacks.on_init(callback);
    }

    pub fn on_before<F>(&self, callback: F)
    where
        F: Fn(&Response, &Arc<dyn Controller>, &str) -> Flow + Send + Sync + 'static,
    {
        self.callbacks.on_before(callback);
    }

    pub fn on_after<F>(&self, callback: F)
    where
        F: Fn(&Response, &Arc<dyn Controller>, &str) + Send + Sync + 'static,
    {
        self.callbacks.on_after(callback);
    }

    pub fn on_invalid<F>(&self, callback: F)
    where
        F: Fn(&Response, &str) + Send + Sync + 'static,
    {
        self.callbacks.on_invalid(callback);
    }

    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(&Response, &ModuleError) + Send + Sync + 'static,
    {
        self.callbacks.on_error(callback);
    }

    pub fn set_view<F>(&self, factory: F)
    where
        F: Fn(&ServiceContainer) -> Template + Send + Sync + 'static,
    {
        self.services.container.set_view(factory);
    }

    pub fn view(&self) -> Option<Arc<Template>> {
        self.services.container.view()
    }

    pub fn set_session<F>(&self, factory: F)
    where
        F: Fn(&ServiceContainer) -> Session + Send + Sync + 'static,
    {
        self.services.container.set_session(factory);
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.services.container.session()
    }

    /// Whether the request can be processed by this module
    pub fn can_process_request(&self, request: &Request) -> ModuleResult<bool> {
        self.setup()?;
        Ok(self.services.dispatcher.can_process_request(request))
    }
}

impl<S: ModuleSetup + 'static> Module<S> {
    /// Process a request and return the shared response.
    ///
    /// Execution faults are returned unless an error callback is set.
    pub fn process_request(self: &Arc<Self>, request: &Request) -> ModuleResult<Arc<Response>> {
        self.setup()?;
        self.register_handlers();

        let dispatcher = &self.services.dispatcher;
        if dispatcher.can_process_request(request) {
            dispatcher.process_request(request)?;
        } else {
            debug!("Request has no target, nothing to process");
        }
        Ok(self.shared_response())
    }
}
