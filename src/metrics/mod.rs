//! # Metrics snapshots.
//!
//! [`MetricsCollector`] queries a fixed, ordered list of [`MetricsSource`]s
//! concurrently and merges whatever arrives before the deadline into a
//! [`MetricsSnapshot`].
//!
//! ## Source order
//! Built-in sources come first (`containers`, then `tasks`), followed by user
//! sources in the order they were given to the builder. The order decides
//! which value wins when two sources emit the same metric name.

mod collector;

pub use collector::{MetricsCollector, MetricsSnapshot, MetricsSource};
