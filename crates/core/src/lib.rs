//! Shared types for the prescription entry client.
//!
//! Holds the provider data model, symbolic key names, the run
//! configuration value object, and the core error type. Nothing in this
//! crate performs I/O beyond reading environment variables in
//! [`config::AutomationConfig::from_env`].

pub mod config;
pub mod error;
pub mod keys;
pub mod types;
