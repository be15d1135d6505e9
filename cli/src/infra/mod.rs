//! SSH, HTTP and filesystem adapters behind the application ports.
//!
//! All I/O lives here: the SSH session, the key download, and the config file.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod config;
pub mod keys;
pub mod ssh;
