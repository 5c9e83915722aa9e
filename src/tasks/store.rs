//! # Task store: snapshot-able task/executor/framework bookkeeping.
//!
//! The execution core owns the lifecycle of tasks, executors and frameworks and
//! records every change here; call handlers only read. All state sits behind one
//! lock so every read is a single consistent instant.
//!
//! ## Architecture
//! ```text
//! execution core ──► add_task / move_task / complete_executor ... ──► write lock
//!                                                                        │
//!                                                                 Inner { frameworks,
//!                                                                         executors,
//!                                                                         tasks: id → (partition, task) }
//!                                                                        │
//! GET_TASKS / GET_STATE ──► tasks() / state() ──► read lock ──► copy ────┘
//! ```
//!
//! ## Rules
//! - A task lives under one key, tagged with its partition, so it cannot appear
//!   in two partitions at once.
//! - Moves only go forward in [`TaskPartition`] order.
//! - Completed frameworks/executors are append-only here; pruning is external policy.
//! - Writers wait for in-flight snapshot copies; readers never see a half-applied move.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::model::{
    ExecutorInfo, ExecutorSnapshot, FrameworkInfo, FrameworkSnapshot, StateSnapshot, Task,
    TaskPartition, TaskSnapshot, TaskStatus,
};
use crate::error::CallError;
use crate::metrics::MetricsSource;
use crate::protocol::Metric;

#[derive(Default)]
struct Inner {
    frameworks: BTreeMap<String, FrameworkInfo>,
    completed_frameworks: Vec<FrameworkInfo>,
    /// Keyed by (framework_id, executor_id).
    executors: BTreeMap<(String, String), ExecutorInfo>,
    completed_executors: Vec<ExecutorInfo>,
    tasks: BTreeMap<String, (TaskPartition, Task)>,
}

impl Inner {
    fn task_snapshot(&self) -> TaskSnapshot {
        let mut snap = TaskSnapshot::default();
        for (partition, task) in self.tasks.values() {
            snap.partition_mut(*partition).push(task.clone());
        }
        snap
    }

    fn framework_snapshot(&self) -> FrameworkSnapshot {
        FrameworkSnapshot {
            active: self.frameworks.values().cloned().collect(),
            completed: self.completed_frameworks.clone(),
        }
    }

    fn executor_snapshot(&self) -> ExecutorSnapshot {
        ExecutorSnapshot {
            active: self.executors.values().cloned().collect(),
            completed: self.completed_executors.clone(),
        }
    }
}

/// Registry of task, executor and framework records.
#[derive(Default)]
pub struct TaskStore {
    inner: RwLock<Inner>,
}

impl TaskStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------
    // Readers
    // ---------------------------

    /// Returns all tasks split by partition, taken at one instant.
    pub async fn tasks(&self) -> TaskSnapshot {
        self.inner.read().await.task_snapshot()
    }

    /// Returns active and completed frameworks from one read pass.
    pub async fn frameworks(&self) -> FrameworkSnapshot {
        self.inner.read().await.framework_snapshot()
    }

    /// Returns active and completed executors from one read pass.
    pub async fn executors(&self) -> ExecutorSnapshot {
        self.inner.read().await.executor_snapshot()
    }

    /// Returns tasks, executors and frameworks under a single read lock.
    pub async fn state(&self) -> StateSnapshot {
        let inner = self.inner.read().await;
        StateSnapshot {
            tasks: inner.task_snapshot(),
            executors: inner.executor_snapshot(),
            frameworks: inner.framework_snapshot(),
        }
    }

    // ---------------------------
    // Writers (execution core)
    // ---------------------------

    /// Registers an active framework.
    pub async fn add_framework(&self, framework: FrameworkInfo) -> Result<(), CallError> {
        let mut inner = self.inner.write().await;
        if inner.frameworks.contains_key(&framework.id) {
            return Err(CallError::already_exists(format!(
                "framework '{}'",
                framework.id
            )));
        }
        inner.frameworks.insert(framework.id.clone(), framework);
        Ok(())
    }

    /// Moves a framework from active to completed.
    pub async fn complete_framework(&self, framework_id: &str) -> Result<(), CallError> {
        let mut inner = self.inner.write().await;
        let framework = inner
            .frameworks
            .remove(framework_id)
            .ok_or_else(|| CallError::not_found(format!("framework '{framework_id}'")))?;
        inner.completed_frameworks.push(framework);
        Ok(())
    }

    /// Registers an active executor.
    pub async fn add_executor(&self, executor: ExecutorInfo) -> Result<(), CallError> {
        let key = (executor.framework_id.clone(), executor.executor_id.clone());
        let mut inner = self.inner.write().await;
        if inner.executors.contains_key(&key) {
            return Err(CallError::already_exists(format!(
                "executor '{}' of framework '{}'",
                key.1, key.0
            )));
        }
        inner.executors.insert(key, executor);
        Ok(())
    }

    /// Moves an executor from active to completed.
    pub async fn complete_executor(
        &self,
        framework_id: &str,
        executor_id: &str,
    ) -> Result<(), CallError> {
        let key = (framework_id.to_string(), executor_id.to_string());
        let mut inner = self.inner.write().await;
        let executor = inner.executors.remove(&key).ok_or_else(|| {
            CallError::not_found(format!(
                "executor '{executor_id}' of framework '{framework_id}'"
            ))
        })?;
        inner.completed_executors.push(executor);
        Ok(())
    }

    /// Inserts a task into `partition`.
    pub async fn add_task(&self, task: Task, partition: TaskPartition) -> Result<(), CallError> {
        let mut inner = self.inner.write().await;
        if inner.tasks.contains_key(&task.task_id) {
            return Err(CallError::already_exists(format!("task '{}'", task.task_id)));
        }
        inner.tasks.insert(task.task_id.clone(), (partition, task));
        Ok(())
    }

    /// Moves a task to a later partition.
    ///
    /// Moving to the partition it already occupies is a no-op; moving backwards
    /// is rejected.
    pub async fn move_task(&self, task_id: &str, to: TaskPartition) -> Result<(), CallError> {
        let mut inner = self.inner.write().await;
        let (partition, _) = inner
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| CallError::not_found(format!("task '{task_id}'")))?;
        if to < *partition {
            return Err(CallError::invalid(format!(
                "task '{task_id}' cannot move from {} back to {}",
                partition.as_str(),
                to.as_str()
            )));
        }
        *partition = to;
        Ok(())
    }

    /// Records the latest status of a task.
    pub async fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<(), CallError> {
        let mut inner = self.inner.write().await;
        let (_, task) = inner
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| CallError::not_found(format!("task '{task_id}'")))?;
        task.status = status;
        Ok(())
    }

    /// Forgets a task entirely.
    pub async fn remove_task(&self, task_id: &str) -> Result<Task, CallError> {
        let mut inner = self.inner.write().await;
        inner
            .tasks
            .remove(task_id)
            .map(|(_, task)| task)
            .ok_or_else(|| CallError::not_found(format!("task '{task_id}'")))
    }
}

#[async_trait]
impl MetricsSource for TaskStore {
    fn name(&self) -> &str {
        "tasks"
    }

    async fn collect(&self) -> Vec<Metric> {
        let inner = self.inner.read().await;
        let mut counts = [0usize; 5];
        for (partition, _) in inner.tasks.values() {
            counts[*partition as usize] += 1;
        }

        let mut metrics: Vec<Metric> = TaskPartition::ALL
            .iter()
            .zip(counts)
            .map(|(p, n)| Metric::new(format!("tasks/{}", p.as_str()), n as f64))
            .collect();
        metrics.push(Metric::new(
            "frameworks/active",
            inner.frameworks.len() as f64,
        ));
        metrics.push(Metric::new(
            "frameworks/completed",
            inner.completed_frameworks.len() as f64,
        ));
        metrics.push(Metric::new("executors/active", inner.executors.len() as f64));
        metrics.push(Metric::new(
            "executors/completed",
            inner.completed_executors.len() as f64,
        ));
        metrics
    }
}
