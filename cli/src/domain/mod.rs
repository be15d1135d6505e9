//! Pure types, command builders and validation.
//!
//! Nothing here imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::net::TcpStream`.

pub mod config;
pub mod error;
pub mod keys;
pub mod privilege;
pub mod report;
pub mod s3;
pub mod secret;
pub mod settings;
pub mod shell;

pub use error::{
    CommandError, ConnectionError, KeyProviderError, LayerError, ParseError, ReconcileError,
    ReconcileStage, StepFailure,
};
pub use report::{LayerReport, StepOutcome, StepReport, TailOutcome};
pub use secret::Secret;
pub use settings::{BootstrapSettings, KeySource, SoftwareSettings, StaticNetwork};
pub use shell::ShellCommand;
