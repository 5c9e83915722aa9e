//! # Execution backend seam.
//!
//! The [`Backend`] trait is everything the container manager needs from the
//! component that actually starts and stops processes. The manager never
//! interprets exit statuses; it forwards what [`Backend::wait`] returns.
//!
//! Two implementations ship with the crate:
//! - [`UnavailableBackend`] rejects every launch (default when none is configured);
//! - [`ManualBackend`] keeps containers "running" until told to exit, for tests and demos.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::BackendError;
use crate::protocol::{CommandInfo, ContainerId, ContainerInfo, Resource, ResourceStatistics};

/// What to run, as given in LAUNCH_NESTED_CONTAINER.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaunchSpec {
    pub command: Option<CommandInfo>,
    pub container: Option<ContainerInfo>,
    pub resources: Vec<Resource>,
}

/// Process execution backend.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use nodevisor::{Backend, BackendError, ContainerId, LaunchSpec};
///
/// struct AlwaysZero;
///
/// #[async_trait]
/// impl Backend for AlwaysZero {
///     async fn launch(&self, _id: &ContainerId, _spec: &LaunchSpec) -> Result<(), BackendError> {
///         Ok(())
///     }
///     async fn wait(&self, _id: &ContainerId) -> Result<Option<i32>, BackendError> {
///         Ok(Some(0))
///     }
///     async fn kill(&self, _id: &ContainerId) -> Result<(), BackendError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Hands the container to the backend.
    ///
    /// Returns once the backend accepted the launch; must not wait for the
    /// process to start or finish.
    async fn launch(&self, id: &ContainerId, spec: &LaunchSpec) -> Result<(), BackendError>;

    /// Resolves when the container has exited.
    ///
    /// `Some(code)` is a normal exit; `None` means signal or unknown cause.
    async fn wait(&self, id: &ContainerId) -> Result<Option<i32>, BackendError>;

    /// Requests unconditional termination. Returns without waiting for exit.
    async fn kill(&self, id: &ContainerId) -> Result<(), BackendError>;

    /// Current resource usage, if the backend tracks it.
    async fn usage(&self, _id: &ContainerId) -> Result<Option<ResourceStatistics>, BackendError> {
        Ok(None)
    }
}

/// Backend used when the agent was built without one.
#[derive(Debug, Default)]
pub struct UnavailableBackend;

#[async_trait]
impl Backend for UnavailableBackend {
    async fn launch(&self, _id: &ContainerId, _spec: &LaunchSpec) -> Result<(), BackendError> {
        Err(BackendError::failed("no execution backend configured"))
    }

    async fn wait(&self, id: &ContainerId) -> Result<Option<i32>, BackendError> {
        Err(BackendError::Unknown {
            what: id.to_string(),
        })
    }

    async fn kill(&self, id: &ContainerId) -> Result<(), BackendError> {
        Err(BackendError::Unknown {
            what: id.to_string(),
        })
    }
}

/// In-memory backend whose containers run until [`ManualBackend::exit`] or a kill.
///
/// A kill terminates the container without an exit code (`None`), like a signal.
#[derive(Debug, Default)]
pub struct ManualBackend {
    running: Mutex<HashMap<String, watch::Sender<Option<Option<i32>>>>>,
    fail_launch: AtomicBool,
    fail_kill: AtomicBool,
}

impl ManualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the container exit with `status`. Returns false if unknown or already exited.
    pub fn exit(&self, id: &ContainerId, status: Option<i32>) -> bool {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        match running.get(&id.value) {
            Some(tx) => tx.send_if_modified(|slot| {
                if slot.is_some() {
                    return false;
                }
                *slot = Some(status);
                true
            }),
            None => false,
        }
    }

    /// Returns true if the backend launched `id` and it has not exited.
    pub fn is_running(&self, id: &ContainerId) -> bool {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running
            .get(&id.value)
            .is_some_and(|tx| tx.borrow().is_none())
    }

    /// Makes subsequent launches fail.
    pub fn fail_launches(&self, fail: bool) {
        self.fail_launch.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent kills fail.
    pub fn fail_kills(&self, fail: bool) {
        self.fail_kill.store(fail, Ordering::SeqCst);
    }

    fn exit_channel(&self, id: &ContainerId) -> Result<watch::Receiver<Option<Option<i32>>>, BackendError> {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running
            .get(&id.value)
            .map(|tx| tx.subscribe())
            .ok_or_else(|| BackendError::Unknown {
                what: id.to_string(),
            })
    }
}

#[async_trait]
impl Backend for ManualBackend {
    async fn launch(&self, id: &ContainerId, _spec: &LaunchSpec) -> Result<(), BackendError> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(BackendError::failed("launch refused"));
        }
        let (tx, _rx) = watch::channel(None);
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running.insert(id.value.clone(), tx);
        Ok(())
    }

    async fn wait(&self, id: &ContainerId) -> Result<Option<i32>, BackendError> {
        let mut rx = self.exit_channel(id)?;
        let exited = rx
            .wait_for(|slot| slot.is_some())
            .await
            .map_err(|_| BackendError::failed("exit channel closed"))?;
        Ok(exited.flatten())
    }

    async fn kill(&self, id: &ContainerId) -> Result<(), BackendError> {
        if self.fail_kill.load(Ordering::SeqCst) {
            return Err(BackendError::failed("kill refused"));
        }
        if !self.running.lock().unwrap_or_else(|e| e.into_inner()).contains_key(&id.value) {
            return Err(BackendError::Unknown {
                what: id.to_string(),
            });
        }
        self.exit(id, None);
        Ok(())
    }

    async fn usage(&self, id: &ContainerId) -> Result<Option<ResourceStatistics>, BackendError> {
        let processes = u32::from(self.is_running(id));
        Ok(Some(ResourceStatistics {
            processes: Some(processes),
            ..ResourceStatistics::default()
        }))
    }
}
