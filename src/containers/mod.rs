//! # Nested containers.
//!
//! - [`ContainerManager`] - container table, launch / wait / kill, listing
//! - [`Backend`] - the process execution seam the manager drives
//! - [`ManualBackend`], [`UnavailableBackend`] - bundled backends
//!
//! Each launched container gets a watcher task that waits on the backend and
//! records the exit; waiters observe the record, never the backend.

mod backend;
mod manager;
mod record;
mod watcher;

pub use backend::{Backend, LaunchSpec, ManualBackend, UnavailableBackend};
pub use manager::ContainerManager;
