//! Option stores and configuration loading
//!
//! Options are kept flat under dot-separated keys. Every write is
//! set-if-absent: a value already present is never replaced, so module
//! defaults cannot clobber values configured elsewhere.

use std::{fs, path::Path};

use dashmap::{mapref::entry::Entry, DashMap};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use validator::Validate;

use crate::{
    config_error,
    core::error::ModuleResult,
};

pub const JS_APP_EXTERN: &str = "js.app.extern";
pub const JS_APP_MINIFY: &str = "js.app.minify";
pub const JS_APP_URI: &str = "js.app.uri";
pub const JS_APP_DIR: &str = "js.app.dir";
pub const REQUEST_URI: &str = "core.request.uri";
pub const CLASS_PREFIX: &str = "core.prefix.class";
pub const JS_LIB_URI: &str = "js.lib.uri";
pub const LOG_LEVEL: &str = "log.level";
pub const LOG_PATH: &str = "log.path";

pub const CONTROLLERS_DIRECTORY: &str = "controllers.directory";
pub const CONTROLLERS_NAMESPACE: &str = "controllers.namespace";
pub const CONTROLLERS_SEPARATOR: &str = "controllers.separator";
pub const CONTROLLERS_PROTECTED: &str = "controllers.protected";

/// Value given to `core.request.uri` when nothing configured it.
pub const DEFAULT_REQUEST_URI: &str = "jaxon";
/// Prefix of the javascript classes generated for controllers.
pub const DEFAULT_CLASS_PREFIX: &str = "Jaxon";
pub const DEFAULT_JS_LIB_URI: &str = "https://cdn.jsdelivr.net/gh/jaxon-php/jaxon-js@4.0/dist";

/// A flat, dot-addressed option set with set-if-absent writes.
#[derive(Debug, Default)]
pub struct Options {
    values: DashMap<String, JsonValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option unless the key already holds a value.
    ///
    /// Returns true when the value was written.
    pub fn set_option(&self, key: impl Into<String>, value: JsonValue) -> bool {
        match self.values.entry(key.into()) {
            Entry::Occupied(entry) => {
                trace!("Option {} already set, keeping current value", entry.key());
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Import a nested bag of options.
    ///
    /// `prefix` is a dot path selecting the sub-tree of `bag` to import; `None`
    /// or an empty prefix imports the whole bag. Objects are flattened into
    /// dot keys, anything else (including arrays) is stored as a leaf. A prefix
    /// that does not resolve to an object imports nothing.
    ///
    /// Returns the number of keys actually written.
    pub fn set_options(&self, bag: &JsonValue, prefix: Option<&str>) -> usize {
        let root = match prefix.filter(|p| !p.is_empty()) {
            Some(path) => match lookup(bag, path) {
                Some(value) => value,
                None => {
                    debug!("No options found under {path}");
                    return 0;
                }
            },
            None => bag,
        };

        match root {
            JsonValue::Object(map) => self.import(map, ""),
            _ => 0,
        }
    }

    fn import(&self, map: &Map<String, JsonValue>, prefix: &str) -> usize {
        let mut written = 0;
        for (key, value) in map {
            let full_key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                JsonValue::Object(inner) => written += self.import(inner, &full_key),
                _ => {
                    if self.set_option(full_key, value.clone()) {
                        written += 1;
                    }
                }
            }
        }
        written
    }

    /// Get a copy of an option value.
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.values.get(key).map(|entry| entry.value().clone())
    }

    /// Get an option value, or `default` when absent.
    pub fn get_option(&self, key: &str, default: JsonValue) -> JsonValue {
        self.get(key).unwrap_or(default)
    }

    pub fn get_str(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .and_then(|entry| entry.value().as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values
            .get(key)
            .and_then(|entry| entry.value().as_bool())
            .unwrap_or(default)
    }

    /// Get a list of strings. Non-string items are skipped, a missing key
    /// yields an empty list.
    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(JsonValue::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            Some(JsonValue::String(item)) => vec![item],
            _ => Vec::new(),
        }
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn lookup<'a>(bag: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .try_fold(bag, |node, segment| node.as_object()?.get(segment))
}

/// Library defaults a module provides during setup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct LibraryOptions {
    /// Serve the generated javascript from an external file
    #[serde(default, rename = "extern")]
    pub external: bool,
    #[serde(default)]
    pub minify: bool,
    #[validate(length(min = 1))]
    pub uri: String,
    #[serde(default)]
    pub dir: String,
}

/// Application defaults a module provides during setup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ApplicationOptions {
    #[validate(length(min = 1))]
    pub directory: String,
    #[serde(default)]
    pub namespace: String,
}

/// Reads option files into option stores.
pub struct ConfigReader;

impl ConfigReader {
    /// Read a YAML or JSON config file.
    ///
    /// The sub-tree under `lib_keys` is imported into `options`. When
    /// `app_keys` is given, the sub-tree under it is loaded into a new
    /// application option store which is returned.
    pub fn read<P: AsRef<Path>>(
        path: P,
        lib_keys: &str,
        app_keys: Option<&str>,
        options: &Options,
    ) -> ModuleResult<Option<Options>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            config_error!("Unable to read config file {}: {}", path.display(), e)
        })?;
        debug!("Config file read from {}", path.display());

        let data = Self::parse(path, &content)?;
        if !data.is_object() {
            return Err(config_error!(
                "Config file {} does not contain a mapping",
                path.display()
            ));
        }

        let written = options.set_options(&data, Some(lib_keys));
        debug!("Imported {written} library options from {}", path.display());

        let Some(app_keys) = app_keys else {
            return Ok(None);
        };
        let app_config = Options::new();
        app_config.set_options(&data, Some(app_keys));
        Ok(Some(app_config))
    }

    fn parse(path: &Path, content: &str) -> ModuleResult<JsonValue> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(content).map_err(|e| {
                config_error!("Unable to parse JSON config {}: {}", path.display(), e)
            })
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                config_error!("Unable to parse YAML config {}: {}", path.display(), e)
            })
        }
    }
}
