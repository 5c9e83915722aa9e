//! # Agent: call dispatch over the node's shared state.
//!
//! The [`Agent`] owns one instance of every component and routes each
//! [`Call`] to the component that owns its tag.
//!
//! ## Routing
//! ```text
//! dispatch_raw(RawCall) ─► Call::try_from ─► dispatch(Call)
//!                                               │
//!   GET_HEALTH / GET_FLAGS / GET_VERSION ───────┼──► AgentInfo
//!   GET_METRICS ────────────────────────────────┼──► MetricsCollector (containers, tasks, user...)
//!   GET/SET_LOGGING_LEVEL ──────────────────────┼──► LoggingLevels
//!   LIST_FILES / READ_FILE ─────────────────────┼──► FileBrowser (length capped)
//!   GET_STATE / FRAMEWORKS / EXECUTORS / TASKS ─┼──► TaskStore
//!   GET_CONTAINERS / LAUNCH / WAIT / KILL ──────┴──► ContainerManager
//! ```
//!
//! ## Event flow
//! ```text
//! components ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//! ```
//!
//! ## Rules
//! - Dispatch holds no lock of its own; concurrent calls only meet inside components.
//! - The response tag always equals the call tag.
//! - A panicking handler becomes `Internal`; the process keeps running.
//! - Every failed call is published as `CallFailed` with the tag and error label.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::builder::AgentBuilder;
use super::collaborators::{AgentInfo, FileBrowser};
use super::config::Config;
use crate::containers::ContainerManager;
use crate::error::{CallError, RuntimeError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::logging::LoggingLevels;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::protocol::{Call, CallType, ListFiles, RawCall, ReadFile, Response};
use crate::subscribers::SubscriberSet;
use crate::tasks::TaskStore;

/// Node agent core.
///
/// Built with [`Agent::builder`]; shared as `Arc<Agent>` by the transport.
pub struct Agent {
    pub(crate) cfg: Config,
    pub(crate) bus: Bus,
    pub(crate) containers: Arc<ContainerManager>,
    pub(crate) tasks: Arc<TaskStore>,
    pub(crate) logging: LoggingLevels,
    pub(crate) metrics: MetricsCollector,
    pub(crate) info: Arc<dyn AgentInfo>,
    pub(crate) files: Arc<dyn FileBrowser>,
    pub(crate) runtime_token: CancellationToken,
    pub(crate) listener: Mutex<Option<JoinHandle<()>>>,
}

impl Agent {
    /// Starts building an agent with `cfg`.
    pub fn builder(cfg: Config) -> AgentBuilder {
        AgentBuilder::new(cfg)
    }

    /// Returns the configuration the agent was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Returns the event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Returns the container manager.
    pub fn containers(&self) -> &Arc<ContainerManager> {
        &self.containers
    }

    /// Returns the task store; the execution core writes through it.
    pub fn tasks(&self) -> &Arc<TaskStore> {
        &self.tasks
    }

    /// Returns the logging-level controller.
    pub fn logging(&self) -> &LoggingLevels {
        &self.logging
    }

    /// Collects a metrics snapshot, reporting which sources missed the deadline.
    pub async fn metrics(&self, timeout: Option<std::time::Duration>) -> MetricsSnapshot {
        self.metrics.snapshot(timeout).await
    }

    /// Validates a decoded call and dispatches it.
    pub async fn dispatch_raw(&self, raw: RawCall) -> Result<Response, CallError> {
        let tag = raw.call_type.unwrap_or(CallType::Unknown);
        match Call::try_from(raw) {
            Ok(call) => self.dispatch(call).await,
            Err(e) => {
                self.report_failure(tag, &e);
                Err(e)
            }
        }
    }

    /// Dispatches a validated call to its handler.
    pub async fn dispatch(&self, call: Call) -> Result<Response, CallError> {
        let tag = call.call_type();
        let res = match AssertUnwindSafe(self.handle(call)).catch_unwind().await {
            Ok(res) => res,
            Err(panic) => {
                tracing::error!(call = %tag, info = %panic_message(&*panic), "call handler panicked");
                Err(CallError::internal(format!("{tag} handler")))
            }
        };
        if let Err(e) = &res {
            self.report_failure(tag, e);
        }
        res
    }

    async fn handle(&self, call: Call) -> Result<Response, CallError> {
        let resp = match call {
            Call::GetHealth => Response::GetHealth {
                healthy: self.info.health().await,
            },
            Call::GetFlags => Response::GetFlags {
                flags: self.info.flags().await,
            },
            Call::GetVersion => Response::GetVersion {
                version_info: self.info.version().await,
            },
            Call::GetMetrics(req) => {
                let timeout = req.timeout.or_else(|| self.cfg.default_metrics_timeout());
                Response::GetMetrics {
                    metrics: self.metrics.snapshot(timeout).await.metrics,
                }
            }
            Call::GetLoggingLevel => Response::GetLoggingLevel {
                level: self.logging.get().await,
            },
            Call::SetLoggingLevel(req) => {
                self.logging.set(req.level, req.duration).await?;
                Response::SetLoggingLevel
            }
            Call::ListFiles(req) => self.list_files(req).await?,
            Call::ReadFile(req) => self.read_file(req).await?,
            Call::GetState => Response::GetState(self.tasks.state().await),
            Call::GetContainers => Response::GetContainers {
                containers: self.containers.list().await,
            },
            Call::GetFrameworks => Response::GetFrameworks(self.tasks.frameworks().await),
            Call::GetExecutors => Response::GetExecutors(self.tasks.executors().await),
            Call::GetTasks => Response::GetTasks(self.tasks.tasks().await),
            Call::LaunchNestedContainer(req) => {
                self.containers.launch(req).await?;
                Response::LaunchNestedContainer
            }
            Call::WaitNestedContainer(req) => Response::WaitNestedContainer {
                exit_status: self.containers.wait(&req.container_id).await?,
            },
            Call::KillNestedContainer(req) => {
                self.containers.kill(&req.container_id).await?;
                Response::KillNestedContainer
            }
        };
        Ok(resp)
    }

    async fn list_files(&self, req: ListFiles) -> Result<Response, CallError> {
        if req.path.is_empty() {
            return Err(CallError::invalid("path must not be empty"));
        }
        let file_infos = self.files.list(&req.path).await.map_err(|e| {
            tracing::debug!(path = %req.path, error = %e, "list files failed");
            e.into_call_error("list files")
        })?;
        Ok(Response::ListFiles { file_infos })
    }

    async fn read_file(&self, req: ReadFile) -> Result<Response, CallError> {
        if req.path.is_empty() {
            return Err(CallError::invalid("path must not be empty"));
        }
        let cap = self.cfg.read_cap();
        let length = req.length.map_or(cap, |l| l.min(cap));
        let (size, data) = self
            .files
            .read(&req.path, req.offset, length)
            .await
            .map_err(|e| {
                tracing::debug!(path = %req.path, error = %e, "read file failed");
                e.into_call_error("read file")
            })?;
        Ok(Response::ReadFile { size, data })
    }

    fn report_failure(&self, tag: CallType, e: &CallError) {
        // The event carries only the label; keep the internal context in the log.
        if let CallError::Internal { .. } = e {
            tracing::warn!(call = %tag, error = %e, "call failed");
        }
        self.bus.publish(
            Event::new(EventKind::CallFailed)
                .with_subject(tag.as_str())
                .with_reason(e.as_label()),
        );
    }

    /// Spawns the task forwarding bus events to subscribers.
    ///
    /// After cancellation it drains what is already queued, then shuts the set down.
    pub(crate) fn spawn_listener(bus: &Bus, subs: SubscriberSet, token: CancellationToken) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => subs.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "subscriber listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => subs.emit(&ev),
                    Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            subs.shutdown().await;
        })
    }

    /// Stops the agent.
    ///
    /// Kills every live container and waits up to [`Config::grace`] for them to
    /// exit, then cancels background work and drains subscribers.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));

        let res = match self.containers.kill_all(self.cfg.grace).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(stuck) => {
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
                );
                Err(RuntimeError::GraceExceeded {
                    grace: self.cfg.grace,
                    stuck,
                })
            }
        };

        self.runtime_token.cancel();
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(listener) = listener {
            let _ = listener.await;
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::ManualBackend;
    use crate::protocol::{ContainerId, GetMetrics, KillNestedContainer, LaunchNestedContainer};
    use std::time::Duration;

    fn agent() -> (Arc<Agent>, Arc<ManualBackend>) {
        let backend = Arc::new(ManualBackend::new());
        let agent = Agent::builder(Config::default())
            .with_backend(backend.clone())
            .build();
        (agent, backend)
    }

    #[tokio::test]
    async fn response_tag_matches_call_tag() {
        let (agent, _) = agent();
        let calls = vec![
            Call::GetHealth,
            Call::GetFlags,
            Call::GetVersion,
            Call::GetLoggingLevel,
            Call::GetState,
            Call::GetContainers,
            Call::GetFrameworks,
            Call::GetExecutors,
            Call::GetTasks,
            Call::GetMetrics(Default::default()),
        ];
        for call in calls {
            let tag = call.call_type();
            let resp = agent.dispatch(call).await.unwrap();
            assert_eq!(resp.call_type(), tag);
        }
    }

    #[tokio::test]
    async fn huge_metrics_timeout_is_answered() {
        let (agent, _) = agent();
        let resp = agent
            .dispatch(Call::GetMetrics(GetMetrics {
                timeout: Some(Duration::from_secs(u64::MAX)),
            }))
            .await
            .unwrap();
        let Response::GetMetrics { metrics } = resp else {
            panic!("wrong response");
        };
        assert!(metrics.iter().any(|m| m.name == "containers/launched"));

        let cfg = Config {
            metrics_timeout: Duration::from_secs(u64::MAX),
            ..Config::default()
        };
        let agent = Agent::builder(cfg).build();
        assert_eq!(
            agent.dispatch(Call::GetMetrics(Default::default())).await.unwrap().call_type(),
            CallType::GetMetrics
        );
    }

    #[tokio::test]
    async fn failures_are_published() {
        let (agent, _) = agent();
        let mut rx = agent.bus().subscribe();

        let err = agent
            .dispatch(Call::KillNestedContainer(KillNestedContainer {
                container_id: ContainerId::new("ghost"),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "not_found");

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::CallFailed);
        assert_eq!(ev.subject.as_deref(), Some("KILL_NESTED_CONTAINER"));
        assert_eq!(ev.reason.as_deref(), Some("not_found"));
    }

    #[tokio::test]
    async fn read_length_is_capped() {
        struct Echo;

        #[async_trait::async_trait]
        impl FileBrowser for Echo {
            async fn list(&self, _path: &str) -> Result<Vec<crate::protocol::FileInfo>, crate::BackendError> {
                Ok(Vec::new())
            }

            async fn read(&self, _path: &str, _offset: u64, length: u64) -> Result<(u64, Vec<u8>), crate::BackendError> {
                Ok((1 << 20, vec![0; length as usize]))
            }
        }

        let agent = Agent::builder(Config::default()).with_files(Arc::new(Echo)).build();
        let resp = agent
            .dispatch(Call::ReadFile(ReadFile {
                path: "/var/log/agent.log".into(),
                offset: 0,
                length: Some(1 << 20),
            }))
            .await
            .unwrap();
        match resp {
            Response::ReadFile { size, data } => {
                assert_eq!(size, 1 << 20);
                assert_eq!(data.len() as u64, agent.config().read_cap());
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn default_file_browser_reports_not_found() {
        let (agent, _) = agent();
        let err = agent
            .dispatch(Call::ListFiles(ListFiles { path: "/tmp".into() }))
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "not_found");
    }

    #[tokio::test]
    async fn shutdown_kills_live_containers() {
        let (agent, backend) = agent();
        let id = ContainerId::new("c1");
        agent
            .dispatch(Call::LaunchNestedContainer(LaunchNestedContainer {
                container_id: id.clone(),
                command: None,
                container: None,
                resources: Vec::new(),
            }))
            .await
            .unwrap();
        assert!(backend.is_running(&id));

        agent.shutdown().await.unwrap();
        assert!(!backend.is_running(&id));
        assert!(agent.containers().state(&id).await.unwrap().is_terminated());
    }

    #[tokio::test]
    async fn shutdown_reports_stuck_containers() {
        let backend = Arc::new(ManualBackend::new());
        let cfg = Config {
            grace: Duration::from_millis(20),
            ..Config::default()
        };
        let agent = Agent::builder(cfg).with_backend(backend.clone()).build();
        let id = ContainerId::new("stubborn");
        agent
            .dispatch(Call::LaunchNestedContainer(LaunchNestedContainer {
                container_id: id,
                command: None,
                container: None,
                resources: Vec::new(),
            }))
            .await
            .unwrap();
        backend.fail_kills(true);
        let mut rx = agent.bus().subscribe();

        match agent.shutdown().await {
            Err(RuntimeError::GraceExceeded { stuck, .. }) => assert_eq!(stuck, vec!["stubborn"]),
            other => panic!("unexpected {other:?}"),
        }
        // The event is the only record of which containers were stuck.
        let ev = loop {
            let ev = rx.recv().await.unwrap();
            if ev.kind == EventKind::GraceExceeded {
                break ev;
            }
        };
        assert_eq!(ev.reason.as_deref(), Some("stubborn"));
    }
}
