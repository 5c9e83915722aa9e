//! # Task, executor and framework state.
//!
//! - [`TaskStore`] - lock-guarded records written by the execution core, read by handlers
//! - [`Task`], [`ExecutorInfo`], [`FrameworkInfo`] - the records
//! - [`TaskSnapshot`], [`ExecutorSnapshot`], [`FrameworkSnapshot`], [`StateSnapshot`] -
//!   consistent copies returned by GET_TASKS / GET_EXECUTORS / GET_FRAMEWORKS / GET_STATE

mod model;
mod store;

pub use model::{
    ExecutorInfo, ExecutorSnapshot, FrameworkInfo, FrameworkSnapshot, StateSnapshot, Task,
    TaskPartition, TaskSnapshot, TaskStatus,
};
pub use store::TaskStore;
