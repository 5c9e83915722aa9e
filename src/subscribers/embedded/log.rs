//! # LogWriter: events as tracing records
//!
//! A minimal subscriber that renders incoming [`Event`]s through `tracing`.
//! Install any `tracing` subscriber to see the output.
//!
//! Lifecycle transitions are logged only here. Components log directly only
//! what an event does not carry (backend error details, debug traces).
//!
//! ## Example output
//! ```text
//! INFO  container launched container="e1.c1"
//! INFO  container terminated container="e1.c1" exit_status=Some(0)
//! INFO  kill requested container="e1.c2"
//! INFO  logging level changed level=2 revert_in_ms=10000
//! WARN  metrics source timed out source="tasks" deadline_ms=1
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let container = e.container.as_deref().unwrap_or("-");
        let subject = e.subject.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::ContainerLaunched => {
                tracing::info!(container, "container launched");
            }
            EventKind::ContainerLaunchFailed => {
                tracing::warn!(container, reason, "container launch failed");
            }
            EventKind::ContainerTerminated => {
                tracing::info!(container, exit_status = ?e.exit_status, "container terminated");
            }
            EventKind::ContainerFailed => {
                tracing::warn!(container, reason, "container wait failed");
            }
            EventKind::KillRequested => {
                tracing::info!(container, "kill requested");
            }
            EventKind::LoggingLevelChanged => {
                tracing::info!(level = ?e.level, revert_in_ms = ?e.duration_ms, "logging level changed");
            }
            EventKind::LoggingLevelReverted => {
                tracing::info!(level = ?e.level, "logging level reverted");
            }
            EventKind::MetricsSourceTimedOut => {
                tracing::warn!(source = subject, deadline_ms = ?e.duration_ms, "metrics source timed out");
            }
            EventKind::CallFailed => {
                tracing::warn!(call = subject, reason, "call failed");
            }
            EventKind::ShutdownRequested => {
                tracing::info!("shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!("all containers stopped within grace");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(stuck = reason, "shutdown grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = subject, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = subject, info = reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
