//! Unit tests for rpi-provisioner
//!
//! These tests drive the layer services against an in-memory host and run
//! fast without network or SSH.

mod mocks;
mod property_tests;
mod reconcile;
mod software_layer;
