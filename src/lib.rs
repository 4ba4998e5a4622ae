//! QuietShell: a desktop shell around a web messenger that keeps read
//! receipts, typing indicators and presence to itself.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod ipc_handler;
pub mod managers;
pub mod platform;
pub mod services;
pub mod telemetry;
pub mod types;

#[cfg(feature = "gui")]
pub mod ui;
