//! The response shared by a module, its controllers and its callbacks
//!
//! A response is an ordered list of commands for the client side library.
//! Turning it into bytes on the wire is left to the transport layer.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::{json, Value as JsonValue};

/// One client side command
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Command {
    /// Command name
    pub cmd: String,
    /// Command payload
    pub data: JsonValue,
}

/// Response built while processing a request
#[derive(Debug, Default)]
pub struct Response {
    commands: Mutex<Vec<Command>>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Command>> {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a raw command
    pub fn add_command(&self, cmd: impl Into<String>, data: JsonValue) {
        self.lock().push(Command {
            cmd: cmd.into(),
            data,
        });
    }

    /// Replace an attribute of an element
    pub fn assign(&self, target: &str, attribute: &str, value: impl Into<JsonValue>) {
        self.add_command(
            "as",
            json!({"id": target, "prop": attribute, "value": value.into()}),
        );
    }

    /// Append to an attribute of an element
    pub fn append(&self, target: &str, attribute: &str, value: impl Into<JsonValue>) {
        self.add_command(
            "ap",
            json!({"id": target, "prop": attribute, "value": value.into()}),
        );
    }

    pub fn alert(&self, message: &str) {
        self.add_command("al", json!({"message": message}));
    }

    pub fn debug(&self, message: &str) {
        self.add_command("dbg", json!({"message": message}));
    }

    /// Run a piece of javascript on the client
    pub fn script(&self, code: &str) {
        self.add_command("js", json!({"code": code}));
    }

    /// Call a javascript function with arguments
    pub fn call(&self, function: &str, args: Vec<JsonValue>) {
        self.add_command("jc", json!({"func": function, "args": args}));
    }

    pub fn redirect(&self, url: &str) {
        self.add_command("rd", json!({"url": url}));
    }

    /// Snapshot of the commands recorded so far
    pub fn commands(&self) -> Vec<Command> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every recorded command
    pub fn clear(&self) {
        self.lock().clear();
    }
}
