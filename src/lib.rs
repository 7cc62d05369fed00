//! orgpulse library crate
//!
//! Exposes the core modules so the binary, benchmarks and tests share one
//! implementation.

pub mod api;
pub mod app;
pub mod config;
pub mod keyring;
pub mod loader;
pub mod logging;
pub mod reconcile;
pub mod session;
pub mod ui;
pub mod util;
pub mod validate;
