//! Use cases built on the port traits.
//!
//! Services import only from `crate::domain` and `crate::application::ports`,
//! never from `crate::infra`, `crate::commands`, or `crate::output`.

pub mod bootstrap;
pub mod orchestrator;
pub mod reconcile;
pub mod software;
pub mod step;

#[cfg(test)]
pub mod test_support;
