//! # Logging verbosity control.
//!
//! - [`LoggingLevels`] - temporary overrides with automatic revert
//! - [`VerbositySink`] - what an override actually changes
//! - [`TracingVerbosity`] - sink driving a reloadable `tracing_subscriber::EnvFilter`
//! - [`NoopVerbosity`] - sink for embedders that manage logging themselves

mod levels;
mod verbosity;

pub use levels::LoggingLevels;
pub use verbosity::{NoopVerbosity, TracingVerbosity, VerbositySink, directive};
