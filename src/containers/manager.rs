//! # ContainerManager: nested-container lifecycle.
//!
//! The manager owns the container table and turns LAUNCH / WAIT / KILL calls
//! into backend requests.
//!
//! ## Architecture
//! ```text
//! launch(id) ─► validate ─► table.write: parent known? value unused? insert Creating
//!               └─► backend.launch ─► Running ─► spawn ContainerWatcher ─► (deferred kill)
//!                                 └─► error ─► Terminated(None), Internal
//!
//! wait(id)   ─► table.read: lookup ─► subscribe ─► resolves on Terminated
//! kill(id)   ─► table.read: lookup ─► Creating → defer | Running → backend.kill | Terminated → noop
//! ```
//!
//! ## Rules
//! - Records are never removed, so a value is never reused for the agent's lifetime.
//! - The table lock is only held for lookup and insert; backend calls and waits
//!   run on the record alone, so distinct containers never block each other.
//! - Every waiter on a container receives the same exit status.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::RwLock;
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::backend::{Backend, LaunchSpec};
use super::record::{KillAction, Record};
use super::watcher::ContainerWatcher;
use crate::error::CallError;
use crate::events::{Bus, Event, EventKind};
use crate::metrics::MetricsSource;
use crate::protocol::{ContainerId, ContainerState, ContainerStatus, LaunchNestedContainer, Metric};

/// Registry of nested containers for the agent's lifetime.
pub struct ContainerManager {
    containers: RwLock<HashMap<String, Arc<Record>>>,
    backend: Arc<dyn Backend>,
    bus: Bus,
    runtime_token: CancellationToken,
}

impl ContainerManager {
    /// Creates an empty manager. Watchers are children of `runtime_token`.
    pub fn new(backend: Arc<dyn Backend>, bus: Bus, runtime_token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            containers: RwLock::new(HashMap::new()),
            backend,
            bus,
            runtime_token,
        })
    }

    /// Registers and launches a container.
    ///
    /// Returns once the backend accepted the launch, not when the process exits.
    pub async fn launch(&self, req: LaunchNestedContainer) -> Result<(), CallError> {
        let LaunchNestedContainer {
            container_id: id,
            command,
            container,
            resources,
        } = req;
        id.validate().map_err(CallError::invalid)?;

        let record = {
            let mut table = self.containers.write().await;
            if let Some(parent) = id.parent() {
                match table.get(&parent.value) {
                    Some(known) if known.id() == parent => {}
                    _ => return Err(CallError::not_found(format!("parent container '{parent}'"))),
                }
            }
            if table.contains_key(&id.value) {
                return Err(CallError::already_exists(format!("container '{}'", id.value)));
            }
            let record = Arc::new(Record::new(
                id.clone(),
                LaunchSpec {
                    command,
                    container,
                    resources,
                },
            ));
            table.insert(id.value.clone(), Arc::clone(&record));
            record
        };

        let label = id.to_string();
        if let Err(e) = self.backend.launch(&id, record.spec()).await {
            record.terminate(None);
            self.bus.publish(
                Event::new(EventKind::ContainerLaunchFailed)
                    .with_container(label.as_str())
                    .with_reason(e.to_string()),
            );
            return Err(CallError::internal(format!("launch container '{label}'")));
        }

        let kill_pending = record.mark_running();
        self.bus
            .publish(Event::new(EventKind::ContainerLaunched).with_container(label.as_str()));

        let watcher = ContainerWatcher::new(Arc::clone(&record), Arc::clone(&self.backend), self.bus.clone());
        tokio::spawn(watcher.run(self.runtime_token.child_token()));

        if kill_pending {
            // The kill was already acknowledged to its caller.
            if let Err(e) = self.deliver_kill(&record).await {
                tracing::warn!(container = %label, error = %e, "deferred kill failed");
            }
        }
        Ok(())
    }

    /// Waits until the container terminates and returns its exit status.
    ///
    /// Dropping the returned future unregisters this waiter only.
    pub async fn wait(&self, id: &ContainerId) -> Result<Option<i32>, CallError> {
        let record = self.lookup(id).await?;
        Ok(record.terminated().await)
    }

    /// Requests termination. Returns without waiting for the exit.
    pub async fn kill(&self, id: &ContainerId) -> Result<(), CallError> {
        let record = self.lookup(id).await?;
        match record.request_kill() {
            KillAction::Noop => Ok(()),
            KillAction::Deferred => {
                tracing::debug!(container = %id, "kill deferred until launch completes");
                Ok(())
            }
            KillAction::Deliver => self.deliver_kill(&record).await,
        }
    }

    /// Current state of one container.
    pub async fn state(&self, id: &ContainerId) -> Result<ContainerState, CallError> {
        Ok(self.lookup(id).await?.state())
    }

    /// Number of waiters currently registered on a container.
    pub async fn waiters(&self, id: &ContainerId) -> Result<usize, CallError> {
        Ok(self.lookup(id).await?.waiters())
    }

    /// Status of every container ever launched, sorted by value.
    ///
    /// Running containers carry a usage sample when the backend provides one.
    pub async fn list(&self) -> Vec<ContainerStatus> {
        let mut records = self.records().await;
        records.sort_unstable_by(|a, b| a.id().value.cmp(&b.id().value));

        let mut out = Vec::with_capacity(records.len());
        for record in records {
            let state = record.state();
            let statistics = match state {
                ContainerState::Running => match self.backend.usage(record.id()).await {
                    Ok(stats) => stats,
                    Err(e) => {
                        tracing::debug!(container = %record.id(), error = %e, "usage unavailable");
                        None
                    }
                },
                _ => None,
            };
            out.push(ContainerStatus {
                container_id: record.id().clone(),
                state,
                exit_status: state.exit_status(),
                resources: record.spec().resources.clone(),
                statistics,
            });
        }
        out
    }

    /// Kills every live container and waits up to `grace` for them to exit.
    ///
    /// Returns the ids still not terminated when the grace period ran out.
    pub async fn kill_all(&self, grace: Duration) -> Result<(), Vec<String>> {
        let live: Vec<Arc<Record>> = self
            .records()
            .await
            .into_iter()
            .filter(|r| !r.state().is_terminated())
            .collect();

        for record in &live {
            if record.request_kill() == KillAction::Deliver {
                if let Err(e) = self.deliver_kill(record).await {
                    tracing::warn!(container = %record.id(), error = %e, "kill during shutdown failed");
                }
            }
        }

        let all_done = join_all(live.iter().map(|r| r.terminated()));
        if time::timeout(grace, all_done).await.is_ok() {
            return Ok(());
        }

        let mut stuck: Vec<String> = live
            .iter()
            .filter(|r| !r.state().is_terminated())
            .map(|r| r.id().to_string())
            .collect();
        stuck.sort_unstable();
        Err(stuck)
    }

    async fn lookup(&self, id: &ContainerId) -> Result<Arc<Record>, CallError> {
        let table = self.containers.read().await;
        table
            .get(&id.value)
            .filter(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| CallError::not_found(format!("container '{id}'")))
    }

    async fn records(&self) -> Vec<Arc<Record>> {
        self.containers.read().await.values().cloned().collect()
    }

    async fn deliver_kill(&self, record: &Record) -> Result<(), CallError> {
        let label = record.id().to_string();
        if let Err(e) = self.backend.kill(record.id()).await {
            // Lost the race with a natural exit.
            if record.state().is_terminated() {
                return Ok(());
            }
            tracing::warn!(container = %label, error = %e, "kill dispatch failed");
            return Err(CallError::internal(format!("kill container '{label}'")));
        }
        self.bus
            .publish(Event::new(EventKind::KillRequested).with_container(label.as_str()));
        Ok(())
    }
}

#[async_trait]
impl MetricsSource for ContainerManager {
    fn name(&self) -> &str {
        "containers"
    }

    async fn collect(&self) -> Vec<Metric> {
        let (mut creating, mut running, mut terminated, mut waiters) = (0u32, 0u32, 0u32, 0usize);
        let records = self.records().await;
        for record in &records {
            match record.state() {
                ContainerState::Creating => creating += 1,
                ContainerState::Running => running += 1,
                ContainerState::Terminated(_) => terminated += 1,
            }
            waiters += record.waiters();
        }
        vec![
            Metric::new("containers/launched", records.len() as f64),
            Metric::new("containers/creating", f64::from(creating)),
            Metric::new("containers/running", f64::from(running)),
            Metric::new("containers/terminated", f64::from(terminated)),
            Metric::new("containers/waiters", waiters as f64),
        ]
    }
}
