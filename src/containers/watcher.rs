//! # ContainerWatcher: observes one running container until it exits.
//!
//! ## Event flow
//! ```text
//! backend.wait(id) ──Ok(status)──► terminate(status) ──► ContainerTerminated
//!                  ──Err(e)──────► ContainerFailed ──► terminate(None) ──► ContainerTerminated
//! runtime cancelled ─────────────► return (record left as is)
//! ```
//!
//! ## Rules
//! - One watcher per successfully launched container.
//! - The watcher is the only writer of a backend-reported exit status.

use std::sync::Arc;

use tokio::select;
use tokio_util::sync::CancellationToken;

use super::backend::Backend;
use super::record::Record;
use crate::events::{Bus, Event, EventKind};

pub(crate) struct ContainerWatcher {
    record: Arc<Record>,
    backend: Arc<dyn Backend>,
    bus: Bus,
}

impl ContainerWatcher {
    pub fn new(record: Arc<Record>, backend: Arc<dyn Backend>, bus: Bus) -> Self {
        Self {
            record,
            backend,
            bus,
        }
    }

    /// Waits for the backend to report the exit, then terminates the record.
    pub async fn run(self, token: CancellationToken) {
        let id = self.record.id();
        let label = id.to_string();

        let exit = select! {
            _ = token.cancelled() => {
                tracing::debug!(container = %label, "watcher cancelled");
                return;
            }
            res = self.backend.wait(id) => res,
        };

        let status = match exit {
            Ok(status) => status,
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::ContainerFailed)
                        .with_container(label.as_str())
                        .with_reason(e.to_string()),
                );
                None
            }
        };

        if self.record.terminate(status) {
            self.bus.publish(
                Event::new(EventKind::ContainerTerminated)
                    .with_container(label.as_str())
                    .with_exit_status(status),
            );
        }
    }
}
