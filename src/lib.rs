//! Module lifecycle and request dispatch for a server-side AJAX library.
//!
//! A [`orchestration::Module`] sets itself up once, on first use, merging
//! its option defaults, registering its controller directory and building
//! the request validator. Incoming requests are validated, resolved to a
//! controller, and run through the before, after, invalid and error hooks.

pub mod config;
pub mod controller;
pub mod core;
pub mod logging;
pub mod orchestration;
pub mod utils;
