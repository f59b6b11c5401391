//! Client script generation
//!
//! The generated script configures the client library and declares one
//! javascript object per registered controller, with a stub per exported
//! method.

use std::{fmt::Write, sync::Arc};

use serde_json::Value as JsonValue;

use crate::{
    config::{
        Options, CLASS_PREFIX, DEFAULT_CLASS_PREFIX, DEFAULT_JS_LIB_URI, DEFAULT_REQUEST_URI,
        JS_APP_MINIFY, JS_LIB_URI, REQUEST_URI,
    },
    core::{
        context::{CLASS_PARAM, METHOD_PARAM},
        registry::ClassRegistry,
        traits::ScriptGenerator,
    },
};

/// Script generator reading the option store and the registered controllers
pub struct DefaultScripts {
    options: Arc<Options>,
    registry: Arc<ClassRegistry>,
}

impl DefaultScripts {
    pub fn new(options: Arc<Options>, registry: Arc<ClassRegistry>) -> Self {
        Self { options, registry }
    }

    fn quote(value: &str) -> String {
        JsonValue::from(value).to_string()
    }

    fn controllers(&self) -> String {
        let prefix = self.options.get_str(CLASS_PREFIX, DEFAULT_CLASS_PREFIX);
        let mut controllers = self.registry.registered_objects();
        controllers.sort_by(|a, b| a.class_name().cmp(b.class_name()));

        let mut out = String::new();
        for controller in controllers {
            let class_name = controller.class_name();
            let js_class = format!("{prefix}{}", class_name.replace('\\', "."));

            // Parents of a namespaced class must exist first
            let mut path = String::new();
            for segment in js_class.split('.') {
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(segment);
                let _ = writeln!(out, "{path} = {path} || {{}};");
            }

            for method in controller.methods() {
                if self.registry.is_protected(class_name, method) {
                    continue;
                }
                let _ = writeln!(
                    out,
                    "{js_class}.{method} = function() {{ return jaxon.request({{ {CLASS_PARAM}: {}, {METHOD_PARAM}: {} }}, {{ parameters: arguments }}); }};",
                    Self::quote(class_name),
                    Self::quote(method),
                );
            }
        }
        out
    }
}

impl ScriptGenerator for DefaultScripts {
    fn script(&self, include_js: bool, include_css: bool) -> String {
        let mut out = String::new();
        if include_css {
            out.push_str(&self.css());
        }
        if include_js {
            out.push_str(&self.js());
        }

        let request_uri = self.options.get_str(REQUEST_URI, DEFAULT_REQUEST_URI);
        out.push_str("<script type=\"text/javascript\">\n");
        let _ = writeln!(out, "jaxon.config.requestURI = {};", Self::quote(&request_uri));
        out.push_str(&self.controllers());
        out.push_str("</script>\n");
        out
    }

    fn js(&self) -> String {
        let lib_uri = self.options.get_str(JS_LIB_URI, DEFAULT_JS_LIB_URI);
        let suffix = if self.options.get_bool(JS_APP_MINIFY, false) {
            ".min.js"
        } else {
            ".js"
        };
        format!(
            "<script type=\"text/javascript\" src=\"{}/jaxon.core{}\" charset=\"UTF-8\"></script>\n",
            lib_uri.trim_end_matches('/'),
            suffix
        )
    }

    fn css(&self) -> String {
        String::new()
    }
}
