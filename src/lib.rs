//! # nodevisor
//!
//! **Nodevisor** is the call-dispatch and nested-container supervision core of
//! a cluster node agent.
//!
//! A transport (HTTP, gRPC, anything that decodes into [`RawCall`]) hands calls
//! to an [`Agent`]; the agent routes each one to the component owning its tag
//! and answers with a [`Response`] carrying the same tag, or a [`CallError`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!              transport (external)
//!                     │ RawCall
//!                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Agent (dispatcher)                                               │
//! │  - validates the tag/payload pair                                 │
//! │  - routes by tag, catches handler panics                          │
//! └──────┬───────────────┬───────────────┬───────────────┬────────────┘
//!        ▼               ▼               ▼               ▼
//! ┌──────────────┐ ┌─────────────┐ ┌──────────────┐ ┌──────────────────┐
//! │ Container    │ │ TaskStore   │ │ LoggingLevels│ │ MetricsCollector │
//! │ Manager      │ │ (snapshots) │ │ (auto-revert)│ │ (deadline fan-out│
//! └──────┬───────┘ └─────────────┘ └──────┬───────┘ └────────┬─────────┘
//!        │ launch / wait / kill           │ apply            │ collect
//!        ▼                                ▼                  ▼
//!    Backend (external)           VerbositySink      MetricsSource...
//!
//!  every component ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                             ┌────┼────┐
//!                                                             ▼    ▼    ▼
//!                                                          worker per subscriber
//! ```
//!
//! ### Container lifecycle
//! ```text
//! LAUNCH ──► Creating ──backend accepted──► Running ──backend exit──► Terminated(status)
//!               │                                                       ▲
//!               └─────────────────backend refused───────────────────────┘ (status absent)
//!
//! WAIT   ──► resolves on Terminated; all waiters see the same status
//! KILL   ──► Running: backend kill | Creating: deferred | Terminated: no-op
//! ```
//! Container ids are never reused: records stay in the table for the agent's lifetime.
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                          |
//! |-------------------|-----------------------------------------------------------------|---------------------------------------------|
//! | **Protocol**      | Tagged call/response unions with validation.                    | [`RawCall`], [`Call`], [`Response`]         |
//! | **Containers**    | Nested-container launch, wait and kill over a backend.          | [`ContainerManager`], [`Backend`]           |
//! | **Task state**    | Consistent task/executor/framework snapshots.                   | [`TaskStore`]                               |
//! | **Logging**       | Temporary verbosity overrides with automatic revert.            | [`LoggingLevels`], [`TracingVerbosity`]     |
//! | **Metrics**       | Bounded-deadline aggregation over metric sources.               | [`MetricsCollector`], [`MetricsSource`]     |
//! | **Subscriber API**| Hook into runtime events.                                       | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for callers, collaborators and the runtime.        | [`CallError`], [`BackendError`], [`RuntimeError`] |
//! | **Configuration** | Centralize agent settings.                                      | [`Config`], [`AgentBuilder`]                |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use nodevisor::{Agent, Call, Config, ContainerId, LaunchNestedContainer, ManualBackend,
//!                 Response, WaitNestedContainer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(ManualBackend::new());
//!     let agent = Agent::builder(Config::default())
//!         .with_backend(backend.clone())
//!         .build();
//!
//!     let id = ContainerId::generate(None);
//!     agent.dispatch(Call::LaunchNestedContainer(LaunchNestedContainer {
//!         container_id: id.clone(),
//!         command: None,
//!         container: None,
//!         resources: vec![],
//!     })).await?;
//!
//!     backend.exit(&id, Some(0));
//!     let resp = agent
//!         .dispatch(Call::WaitNestedContainer(WaitNestedContainer { container_id: id }))
//!         .await?;
//!     assert_eq!(resp, Response::WaitNestedContainer { exit_status: Some(0) });
//!
//!     agent.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod containers;
mod core;
mod error;
mod events;
mod logging;
mod metrics;
mod protocol;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use containers::{Backend, ContainerManager, LaunchSpec, ManualBackend, UnavailableBackend};
pub use crate::core::{
    Agent, AgentBuilder, AgentInfo, Config, FileBrowser, NoFiles, READ_CAP_PAGES, StaticInfo,
};
pub use error::{BackendError, CallError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use logging::{LoggingLevels, NoopVerbosity, TracingVerbosity, VerbositySink, directive};
pub use metrics::{MetricsCollector, MetricsSnapshot, MetricsSource};
pub use protocol::{
    Call, CallType, CommandInfo, ContainerId, ContainerInfo, ContainerState, ContainerStatus,
    FileInfo, Flag, GetMetrics, KillNestedContainer, LaunchNestedContainer, ListFiles, Metric,
    RawCall, ReadFile, Resource, ResourceStatistics, Response, SetLoggingLevel, VersionInfo,
    WaitNestedContainer,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{
    ExecutorInfo, ExecutorSnapshot, FrameworkInfo, FrameworkSnapshot, StateSnapshot, Task,
    TaskPartition, TaskSnapshot, TaskStatus, TaskStore,
};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
