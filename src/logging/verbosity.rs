//! # Verbosity sinks.
//!
//! A [`VerbositySink`] is the knob the logging controller turns. The agent's
//! numeric levels map onto `tracing` filters:
//!
//! | level | filter  |
//! |-------|---------|
//! | 0     | `info`  |
//! | 1     | `debug` |
//! | ≥ 2   | `trace` |

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::error::BackendError;

/// Applies a verbosity level to the process logger.
pub trait VerbositySink: Send + Sync + 'static {
    /// Switches the logger to `level`. Must not block.
    fn apply(&self, level: u32) -> Result<(), BackendError>;
}

/// Sink that changes nothing; the controller still tracks the level.
#[derive(Debug, Default)]
pub struct NoopVerbosity;

impl VerbositySink for NoopVerbosity {
    fn apply(&self, _level: u32) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Filter directive for a numeric level.
pub fn directive(level: u32) -> &'static str {
    match level {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Sink backed by a reloadable `EnvFilter`.
pub struct TracingVerbosity<S> {
    handle: reload::Handle<EnvFilter, S>,
}

impl<S> TracingVerbosity<S> {
    /// Wraps an existing reload handle.
    pub fn new(handle: reload::Handle<EnvFilter, S>) -> Self {
        Self { handle }
    }
}

impl TracingVerbosity<Registry> {
    /// Installs a global `fmt` subscriber whose filter starts at `baseline`
    /// and returns the sink controlling it.
    ///
    /// Fails if a global subscriber is already installed.
    pub fn install(baseline: u32) -> Result<Self, BackendError> {
        let (filter, handle) = reload::Layer::new(EnvFilter::new(directive(baseline)));
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .try_init()
            .map_err(|e| BackendError::failed(e.to_string()))?;
        Ok(Self { handle })
    }
}

impl<S: 'static> VerbositySink for TracingVerbosity<S> {
    fn apply(&self, level: u32) -> Result<(), BackendError> {
        self.handle
            .reload(EnvFilter::new(directive(level)))
            .map_err(|e| BackendError::failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_directives() {
        assert_eq!(directive(0), "info");
        assert_eq!(directive(1), "debug");
        assert_eq!(directive(7), "trace");
    }

    #[test]
    fn reload_handle_is_driven() {
        let (filter, handle) = reload::Layer::<EnvFilter, Registry>::new(EnvFilter::new("info"));
        let sink = TracingVerbosity::new(handle.clone());
        sink.apply(2).unwrap();
        assert!(handle.with_current(|f| f.to_string()).unwrap().contains("trace"));
        drop(filter);
        assert!(sink.apply(0).is_err());
    }
}
