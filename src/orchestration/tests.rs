//! Tests for the module lifecycle and the request pipeline

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use serde_json::json;

use super::*;
use crate::{
    config::{
        ApplicationOptions, LibraryOptions, Options, CLASS_PREFIX, CONTROLLERS_DIRECTORY,
        CONTROLLERS_PROTECTED, JS_APP_MINIFY, JS_APP_URI, REQUEST_URI,
    },
    controller::testing::demo_factory,
    controller::Controller,
    core::{
        container::ServiceContainer,
        context::{Flow, Request},
        error::{ModuleError, ModuleResult},
        status::SetupState,
        traits::{Dispatcher, EventBus},
    },
};

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Module with the demo defaults, counting its setup runs
#[derive(Default)]
struct DemoModule {
    setup_calls: AtomicUsize,
    check_calls: AtomicUsize,
    fail_check: bool,
}

impl ModuleSetup for DemoModule {
    fn name(&self) -> &str {
        "demo"
    }

    fn setup(&self, config: &mut ModuleConfig<'_>) -> ModuleResult<()> {
        self.setup_calls.fetch_add(1, Ordering::SeqCst);
        config.set_library_options(LibraryOptions {
            external: false,
            minify: true,
            uri: "/js".to_string(),
            dir: "/var/www/js".to_string(),
        })?;
        config.set_application_options(ApplicationOptions {
            directory: "/app/ajax".to_string(),
            namespace: String::new(),
        })
    }

    fn check(&self, _config: &ModuleConfig<'_>) -> ModuleResult<()> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_check {
            return Err(ModuleError::Configuration("check failed".to_string()));
        }
        Ok(())
    }
}

/// Services with an event log and the demo controller class
fn demo_services() -> (ModuleServices, Arc<Mutex<Vec<String>>>) {
    let services = ModuleServices::new();
    services.registry.register_factory("Demo", demo_factory("Demo"));

    let bus = EventRegistry::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    for event in [
        events::PRE_SETUP,
        events::POST_CONFIG,
        events::PRE_CHECK,
        events::POST_SETUP,
    ] {
        let log = log.clone();
        bus.on(event, move |name| log.lock().unwrap().push(name.to_string()));
    }
    let services = ModuleServices {
        events: Arc::new(bus) as Arc<dyn EventBus>,
        ..services
    };
    (services, log)
}

fn demo_module() -> (Arc<Module<DemoModule>>, Arc<Mutex<Vec<String>>>) {
    init_log();
    let (services, log) = demo_services();
    (Arc::new(Module::new(DemoModule::default(), services)), log)
}

#[test]
fn test_setup_runs_once() {
    let (module, log) = demo_module();
    assert_eq!(module.setup_state(), SetupState::Uninitialized);
    assert!(module.response().is_none());

    module.js().unwrap();
    module.css().unwrap();
    module.script(false, false).unwrap();
    module.can_process_request(&Request::default()).unwrap();

    assert!(module.is_setup());
    assert_eq!(module.hooks().setup_calls.load(Ordering::SeqCst), 1);
    assert_eq!(module.hooks().check_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["pre.setup", "post.config", "pre.check", "post.setup"]
    );
    assert_eq!(module.services().registry.class_dirs().len(), 1);
    assert!(module.response().is_some());
}

#[test]
fn test_setup_from_many_threads() {
    let (module, log) = demo_module();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let module = module.clone();
            std::thread::spawn(move || module.js().map(|_| ()))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(module.hooks().setup_calls.load(Ordering::SeqCst), 1);
    assert_eq!(log.lock().unwrap().len(), 4);
}

#[test]
fn test_defaults_never_override() {
    init_log();
    let (services, _) = demo_services();
    services
        .options
        .set_option(JS_APP_URI, json!("https://cdn.example.com/js"));
    let app_config = Options::new();
    app_config.set_option(CONTROLLERS_DIRECTORY, json!("/custom/ajax"));

    let module = Module::new(DemoModule::default(), services).with_app_config(app_config);
    module.setup().unwrap();

    let options = module.options();
    assert_eq!(options.get_str(JS_APP_URI, ""), "https://cdn.example.com/js");
    assert!(options.get_bool(JS_APP_MINIFY, false));
    assert_eq!(options.get_str(REQUEST_URI, ""), "jaxon");
    assert_eq!(
        module.app_config().get_str(CONTROLLERS_DIRECTORY, ""),
        "/custom/ajax"
    );
    assert_eq!(
        module.services().registry.class_dirs()[0].directory,
        "/custom/ajax"
    );
}

#[test]
fn test_partial_defaults_are_not_merged() {
    struct LibraryOnly;

    impl ModuleSetup for LibraryOnly {
        fn name(&self) -> &str {
            "library-only"
        }

        fn setup(&self, config: &mut ModuleConfig<'_>) -> ModuleResult<()> {
            config.set_library_options(LibraryOptions {
                uri: "/js".to_string(),
                ..Default::default()
            })
        }
    }

    init_log();
    let module = Module::new(LibraryOnly, ModuleServices::new());
    module.setup().unwrap();

    assert!(!module.options().has_option(JS_APP_URI));
    assert!(!module.options().has_option(REQUEST_URI));
    assert!(module.services().registry.class_dirs().is_empty());
}

#[test]
fn test_protected_methods_accumulate() {
    init_log();
    let (services, _) = demo_services();
    let app_config = Options::new();
    app_config.set_option(CONTROLLERS_PROTECTED, json!(["foo", "init"]));

    let module = Module::new(DemoModule::default(), services).with_app_config(app_config);
    module.setup().unwrap();

    let protected = module.validator.get().unwrap().protected();
    for method in ["foo", "init", "request", "call"] {
        assert!(protected.contains(method), "{method} should be protected");
    }
    assert!(!protected.contains("hello"));

    let dir = &module.services().registry.class_dirs()[0];
    assert_eq!(dir.protected.iter().filter(|m| *m == "init").count(), 1);
    assert_eq!(dir.protected[0], "foo");
}

#[test]
fn test_failed_setup_can_be_retried() {
    init_log();
    let (services, log) = demo_services();
    let module = Module::new(
        DemoModule {
            fail_check: true,
            ..Default::default()
        },
        services,
    );

    let err = module.js().unwrap_err();
    assert!(matches!(err, ModuleError::Configuration(_)));
    assert_eq!(module.setup_state(), SetupState::Uninitialized);
    assert_eq!(*log.lock().unwrap(), vec!["pre.setup", "post.config", "pre.check"]);

    assert!(module.js().is_err());
    assert_eq!(module.hooks().setup_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_invalid_defaults_fail_setup() {
    struct EmptyUri;

    impl ModuleSetup for EmptyUri {
        fn name(&self) -> &str {
            "empty-uri"
        }

        fn setup(&self, config: &mut ModuleConfig<'_>) -> ModuleResult<()> {
            config.set_library_options(LibraryOptions::default())
        }
    }

    init_log();
    let module = Module::new(EmptyUri, ModuleServices::new());
    assert!(matches!(module.setup(), Err(ModuleError::Validation(_))));
    assert!(!module.is_setup());
}

#[test]
fn test_module_registration_in_container() {
    init_log();
    let container = Arc::new(ServiceContainer::new());

    let base = Module::new(
        DefaultModule,
        ModuleServices {
            container: container.clone(),
            ..ModuleServices::new()
        },
    );
    base.setup().unwrap();
    assert_eq!(container.module_name(), None);

    let (services, _) = demo_services();
    let demo = Module::new(
        DemoModule::default(),
        ModuleServices {
            container: container.clone(),
            ..services
        },
    );
    demo.setup().unwrap();
    assert_eq!(container.module_name().as_deref(), Some("demo"));
}

#[test]
fn test_controller_initialized_once() {
    let (module, _) = demo_module();
    let init_calls = Arc::new(AtomicUsize::new(0));
    let counter = init_calls.clone();
    module.on_init(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let first = module.controller("Demo").unwrap().unwrap();
    let second = module.controller("Demo").unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(init_calls.load(Ordering::SeqCst), 1);

    let response = module.response().unwrap();
    assert!(Arc::ptr_eq(&first.response().unwrap(), &response));

    module.process_request(&Request::new("Demo", "hello")).unwrap();
    assert_eq!(init_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_explicit_registration_initializes_on_use() {
    let (module, _) = demo_module();

    let controller = module.register_class("Demo", json!({})).unwrap();
    assert!(!controller.state().is_initialized());

    let resolved = module.controller("Demo").unwrap().unwrap();
    assert!(Arc::ptr_eq(&controller, &resolved));
    assert!(resolved.state().is_initialized());

    assert!(matches!(
        module.register_class("Missing", json!({})),
        Err(ModuleError::NotFound(_))
    ));
    assert!(module.controller("Missing").unwrap().is_none());
}

#[test]
fn test_register_configured_classes() {
    let (module, _) = demo_module();
    assert_eq!(module.register().unwrap(), 1);
    assert!(module
        .services()
        .registry
        .get_registered_object("Demo")
        .is_some());
}

#[test]
fn test_hello_request() {
    let (module, _) = demo_module();
    let order = Arc::new(Mutex::new(Vec::new()));

    let before = order.clone();
    module.on_before(move |_, controller, method| {
        before
            .lock()
            .unwrap()
            .push(format!("before {}.{method}", controller.class_name()));
        Flow::Continue
    });
    let after = order.clone();
    module.on_after(move |response, _, method| {
        after
            .lock()
            .unwrap()
            .push(format!("after {method} ({} commands)", response.len()));
    });

    let params = HashMap::from([
        ("jxncls".to_string(), "Demo".to_string()),
        ("jxnmthd".to_string(), "hello".to_string()),
        ("jxnargs".to_string(), r#"["world"]"#.to_string()),
    ]);
    let request = Request::from_params(&params);
    assert!(module.can_process_request(&request).unwrap());

    let response = module.process_request(&request).unwrap();
    let commands = response.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].cmd, "as");
    assert_eq!(commands[0].data["value"], "Hello world");
    assert_eq!(
        *order.lock().unwrap(),
        vec!["before Demo.hello", "after hello (1 commands)"]
    );
}

#[test]
fn test_before_callback_aborts() {
    let (module, _) = demo_module();
    let after_calls = Arc::new(AtomicUsize::new(0));
    let counter = after_calls.clone();

    module.on_before(|response, _, _| {
        response.alert("Not allowed");
        Flow::Abort
    });
    module.on_after(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let response = module.process_request(&Request::new("Demo", "hello")).unwrap();
    let commands = response.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].cmd, "al");
    assert_eq!(after_calls.load(Ordering::SeqCst), 0);
    assert!(module.active.lock().unwrap().is_none());
}

#[test]
fn test_invalid_class_is_never_resolved() {
    let (module, _) = demo_module();
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    module.on_invalid(move |_, message| sink.lock().unwrap().push(message.to_string()));
    let before_calls = Arc::new(AtomicUsize::new(0));
    let counter = before_calls.clone();
    module.on_before(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Flow::Continue
    });

    let registry = module.services().registry.clone();
    let calls = registry.registration_calls();
    module.process_request(&Request::new("../Evil", "run")).unwrap();

    assert_eq!(registry.registration_calls(), calls);
    assert_eq!(before_calls.load(Ordering::SeqCst), 0);
    assert_eq!(*messages.lock().unwrap(), vec!["Invalid class name: ../Evil"]);
}

#[test]
fn test_protected_and_unknown_targets_are_invalid() {
    let (module, _) = demo_module();
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    module.on_invalid(move |_, message| sink.lock().unwrap().push(message.to_string()));

    module.process_request(&Request::new("Demo", "init")).unwrap();
    module.process_request(&Request::new("Unknown", "hello")).unwrap();
    module.process_request(&Request::new("Demo", "missing")).unwrap();

    assert_eq!(
        *messages.lock().unwrap(),
        vec![
            "Method Demo.init cannot be called",
            "Unable to find controller Unknown",
            "Method Demo.missing is not exported",
        ]
    );
}

#[test]
fn test_error_without_callback_is_returned() {
    let (module, _) = demo_module();
    let err = module
        .process_request(&Request::new("Demo", "fail"))
        .err()
        .unwrap();
    assert!(matches!(err, ModuleError::Execution(_)));
}

#[test]
fn test_error_callback_absorbs_fault() {
    let (module, _) = demo_module();
    let after_calls = Arc::new(AtomicUsize::new(0));
    let counter = after_calls.clone();
    module.on_after(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    module.on_error(|response, fault| response.debug(&fault.to_string()));

    let response = module.process_request(&Request::new("Demo", "fail")).unwrap();
    let commands = response.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].cmd, "dbg");
    assert_eq!(after_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_request_without_target_is_ignored() {
    let (module, _) = demo_module();
    let request = Request {
        class: Some("Demo".to_string()),
        ..Default::default()
    };
    assert!(!module.can_process_request(&request).unwrap());

    let response = module.process_request(&request).unwrap();
    assert!(response.is_empty());
}

#[test]
fn test_request_factory() {
    let (module, _) = demo_module();

    let factory = module.request("Demo").unwrap().unwrap();
    assert_eq!(factory.call("hello", &[json!("you")]), r#"JaxonDemo.hello("you")"#);
    assert!(module.request("Unknown").unwrap().is_none());

    let (services, _) = demo_services();
    services.options.set_option(CLASS_PREFIX, json!("App"));
    let module = Module::new(DemoModule::default(), services);
    assert_eq!(module.request("Demo").unwrap().unwrap().js_class(), "AppDemo");
}

#[test]
fn test_module_is_dropped_after_processing() {
    let (module, _) = demo_module();
    let dispatcher = module.services().dispatcher.clone();
    module.process_request(&Request::new("Demo", "hello")).unwrap();

    let weak = Arc::downgrade(&module);
    drop(module);
    assert!(weak.upgrade().is_none());
    // Handlers outlive the module without keeping it alive
    dispatcher.process_request(&Request::new("Demo", "hello")).unwrap();
}

#[test]
fn test_view_and_session_services() {
    let (module, _) = demo_module();
    assert!(module.view().is_none());

    module.set_view(|_| crate::utils::template::Template::new("/srv/templates"));
    module.set_session(|_| crate::core::container::Session::new());

    let view = module.view().unwrap();
    assert!(view.has_namespace("jaxon"));
    assert!(Arc::ptr_eq(&view, &module.view().unwrap()));

    module.session().unwrap().set("user", json!("ana"));
    assert_eq!(module.session().unwrap().get("user"), Some(json!("ana")));
}
