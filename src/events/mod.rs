//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the agent, the container
//! manager, container watchers, the logging controller and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Agent` (dispatch failures, shutdown), `ContainerManager`,
//!   container watchers, `LoggingLevels`, `MetricsCollector`, `SubscriberSet` workers.
//! - **Consumers**: the agent's subscriber listener (fans out to `SubscriberSet`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
