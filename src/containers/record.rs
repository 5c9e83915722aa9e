//! # Per-container record.
//!
//! A [`Record`] is the only place a container's state lives. State sits in a
//! `watch` channel: the manager and the watcher write it, every waiter holds
//! its own receiver.
//!
//! ## State machine
//! ```text
//! Creating ──launch ok──► Running ──backend exit──► Terminated(status)
//!     │                                               ▲
//!     └──────────launch failed────────────────────────┘ (status = None)
//! ```
//!
//! ## Rules
//! - `Terminated` is final; later transitions are ignored, so the exit status is set once.
//! - A kill that arrives during `Creating` is remembered and delivered after launch.
//! - Dropping a receiver only tears down that waiter.

use tokio::sync::watch;

use super::backend::LaunchSpec;
use crate::protocol::{ContainerId, ContainerState};

#[derive(Clone, Debug)]
pub(crate) struct Status {
    pub state: ContainerState,
    pub kill_requested: bool,
}

/// What a kill request should do right now.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum KillAction {
    /// Already terminated; nothing to do.
    Noop,
    /// Still creating; delivered once launch succeeds.
    Deferred,
    /// Running; send the kill to the backend.
    Deliver,
}

pub(crate) struct Record {
    id: ContainerId,
    spec: LaunchSpec,
    status: watch::Sender<Status>,
}

impl Record {
    pub fn new(id: ContainerId, spec: LaunchSpec) -> Self {
        let (status, _) = watch::channel(Status {
            state: ContainerState::Creating,
            kill_requested: false,
        });
        Self { id, spec, status }
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    pub fn state(&self) -> ContainerState {
        self.status.borrow().state
    }

    /// Registers a waiter.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    /// Number of registered waiters.
    pub fn waiters(&self) -> usize {
        self.status.receiver_count()
    }

    /// Creating → Running. Returns true if a kill was requested meanwhile.
    pub fn mark_running(&self) -> bool {
        let mut kill = false;
        self.status.send_if_modified(|s| {
            if s.state != ContainerState::Creating {
                return false;
            }
            s.state = ContainerState::Running;
            kill = s.kill_requested;
            true
        });
        kill
    }

    /// Records a kill request and decides how to handle it.
    pub fn request_kill(&self) -> KillAction {
        let mut action = KillAction::Noop;
        self.status.send_if_modified(|s| match s.state {
            ContainerState::Terminated(_) => false,
            ContainerState::Creating => {
                action = KillAction::Deferred;
                let first = !s.kill_requested;
                s.kill_requested = true;
                first
            }
            ContainerState::Running => {
                action = KillAction::Deliver;
                let first = !s.kill_requested;
                s.kill_requested = true;
                first
            }
        });
        action
    }

    /// Moves to `Terminated(exit)`. Returns false if already terminated.
    pub fn terminate(&self, exit: Option<i32>) -> bool {
        self.status.send_if_modified(|s| {
            if s.state.is_terminated() {
                return false;
            }
            s.state = ContainerState::Terminated(exit);
            true
        })
    }

    /// Resolves with the exit status once terminated.
    pub async fn terminated(&self) -> Option<i32> {
        let mut rx = self.subscribe();
        let exit = match rx.wait_for(|s| s.state.is_terminated()).await {
            Ok(status) => status.state.exit_status(),
            // The sender lives as long as `self`.
            Err(_) => None,
        };
        exit
    }
}
