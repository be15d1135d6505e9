//! Ports and the services that drive them.
//!
//! This module depends only on `crate::domain`, never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod ports;
pub mod services;

pub use ports::{CommandResult, ConfigStore, KeyProvider, ProgressReporter, RemoteSession};
