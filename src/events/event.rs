//! # Runtime events emitted by the agent core.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Container events**: nested-container lifecycle (launched, terminated, killed)
//! - **Control events**: logging-level overrides and metrics collection
//! - **Dispatch events**: call handler failures
//! - **Runtime events**: subscriber health and agent shutdown
//!
//! The [`Event`] struct carries additional metadata such as timestamps, container id,
//! exit status, and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use nodevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ContainerTerminated)
//!     .with_container("parent.child")
//!     .with_exit_status(Some(0));
//!
//! assert_eq!(ev.kind, EventKind::ContainerTerminated);
//! assert_eq!(ev.container.as_deref(), Some("parent.child"));
//! assert_eq!(ev.exit_status, Some(0));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subject`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subject`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Shutdown events ===
    /// Agent shutdown requested.
    ShutdownRequested,

    /// All containers terminated within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some containers did not terminate in time.
    GraceExceeded,

    // === Container lifecycle events ===
    /// Backend accepted a nested container launch.
    ///
    /// Sets:
    /// - `container`: container id (dotted path)
    ContainerLaunched,

    /// Backend rejected a nested container launch.
    ///
    /// Sets:
    /// - `container`: container id
    /// - `reason`: backend error label
    ContainerLaunchFailed,

    /// Container reached its terminal state.
    ///
    /// Sets:
    /// - `container`: container id
    /// - `exit_status`: exit status, absent for signal/unknown
    ContainerTerminated,

    /// Backend failed while waiting on the container; it is treated as terminated.
    ///
    /// Sets:
    /// - `container`: container id
    /// - `reason`: backend error label
    ContainerFailed,

    /// Kill was delivered to the backend.
    ///
    /// Sets:
    /// - `container`: container id
    KillRequested,

    // === Control events ===
    /// Logging verbosity override applied.
    ///
    /// Sets:
    /// - `level`: new level
    /// - `duration_ms`: time until revert
    LoggingLevelChanged,

    /// Logging verbosity override expired.
    ///
    /// Sets:
    /// - `level`: restored level
    LoggingLevelReverted,

    /// A metrics source did not answer before the collection deadline.
    ///
    /// Sets:
    /// - `subject`: source name
    /// - `duration_ms`: deadline that was hit
    MetricsSourceTimedOut,

    // === Dispatch events ===
    /// A call handler returned an error.
    ///
    /// Sets:
    /// - `subject`: call type tag
    /// - `reason`: error label
    CallFailed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Container id (dotted path), if applicable.
    pub container: Option<Arc<str>>,
    /// Exit status of a terminated container.
    pub exit_status: Option<i32>,
    /// Logging level for control events.
    pub level: Option<u32>,
    /// Duration in milliseconds (compact).
    pub duration_ms: Option<u32>,
    /// Subscriber, metrics source or call type the event refers to.
    pub subject: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            container: None,
            exit_status: None,
            level: None,
            duration_ms: None,
            subject: None,
            reason: None,
        }
    }

    /// Attaches a container id.
    #[inline]
    pub fn with_container(mut self, container: impl Into<Arc<str>>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Attaches an exit status (absent = signal or unknown).
    #[inline]
    pub fn with_exit_status(mut self, status: Option<i32>) -> Self {
        self.exit_status = status;
        self
    }

    /// Attaches a logging level.
    #[inline]
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    /// Attaches a duration (stored as milliseconds).
    #[inline]
    pub fn with_duration(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.duration_ms = Some(ms);
        self
    }

    /// Attaches the subject name.
    #[inline]
    pub fn with_subject(mut self, subject: impl Into<Arc<str>>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_subject(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_subject(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::ContainerLaunched);
        let b = Event::new(EventKind::ContainerLaunched);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn duration_is_clamped() {
        let ev = Event::new(EventKind::LoggingLevelChanged).with_duration(Duration::MAX);
        assert_eq!(ev.duration_ms, Some(u32::MAX));
    }
}
