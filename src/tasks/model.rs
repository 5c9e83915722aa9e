//! Task, executor and framework records, and the snapshot shapes built from them.

use serde::{Deserialize, Serialize};

use crate::protocol::{ContainerId, Resource};

/// One of the five stages a task occupies. Declared in lifecycle order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPartition {
    /// Accepted, executor not yet registered.
    Pending,
    /// Handed to an executor that has not acknowledged it yet.
    Queued,
    /// Running under an executor.
    Launched,
    /// Reached a terminal status; the status update is not yet acknowledged.
    Terminated,
    /// Terminal and acknowledged.
    Completed,
}

impl TaskPartition {
    /// All partitions in lifecycle order.
    pub const ALL: [TaskPartition; 5] = [
        TaskPartition::Pending,
        TaskPartition::Queued,
        TaskPartition::Launched,
        TaskPartition::Terminated,
        TaskPartition::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPartition::Pending => "pending",
            TaskPartition::Queued => "queued",
            TaskPartition::Launched => "launched",
            TaskPartition::Terminated => "terminated",
            TaskPartition::Completed => "completed",
        }
    }
}

/// Latest known status of a task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Staging,
    Starting,
    Running,
    Finished,
    Failed,
    Killed,
    Lost,
}

/// Task record as owned by the execution core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique among all tasks known to this agent.
    pub task_id: String,
    pub name: String,
    pub framework_id: String,
    pub executor_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Task {
    pub fn new(
        task_id: impl Into<String>,
        name: impl Into<String>,
        framework_id: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            name: name.into(),
            framework_id: framework_id.into(),
            executor_id: None,
            status: TaskStatus::default(),
            resources: Vec::new(),
        }
    }

    pub fn with_executor(mut self, executor_id: impl Into<String>) -> Self {
        self.executor_id = Some(executor_id.into());
        self
    }
}

/// Framework registered on this agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    pub id: String,
    pub name: String,
    pub user: Option<String>,
}

impl FrameworkInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            user: None,
        }
    }
}

/// Executor running on this agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorInfo {
    /// Unique within its framework.
    pub executor_id: String,
    pub framework_id: String,
    pub name: String,
    /// Top-level container hosting the executor.
    pub container_id: Option<ContainerId>,
}

impl ExecutorInfo {
    pub fn new(
        executor_id: impl Into<String>,
        framework_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            executor_id: executor_id.into(),
            framework_id: framework_id.into(),
            name: name.into(),
            container_id: None,
        }
    }
}

/// GET_TASKS payload: every known task in exactly one list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub pending: Vec<Task>,
    pub queued: Vec<Task>,
    pub launched: Vec<Task>,
    pub terminated: Vec<Task>,
    pub completed: Vec<Task>,
}

impl TaskSnapshot {
    pub(crate) fn partition_mut(&mut self, p: TaskPartition) -> &mut Vec<Task> {
        match p {
            TaskPartition::Pending => &mut self.pending,
            TaskPartition::Queued => &mut self.queued,
            TaskPartition::Launched => &mut self.launched,
            TaskPartition::Terminated => &mut self.terminated,
            TaskPartition::Completed => &mut self.completed,
        }
    }

    /// Total number of tasks across partitions.
    pub fn len(&self) -> usize {
        self.pending.len()
            + self.queued.len()
            + self.launched.len()
            + self.terminated.len()
            + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// GET_FRAMEWORKS payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkSnapshot {
    pub active: Vec<FrameworkInfo>,
    pub completed: Vec<FrameworkInfo>,
}

/// GET_EXECUTORS payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorSnapshot {
    pub active: Vec<ExecutorInfo>,
    pub completed: Vec<ExecutorInfo>,
}

/// GET_STATE payload: the three views taken at one instant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub tasks: TaskSnapshot,
    pub executors: ExecutorSnapshot,
    pub frameworks: FrameworkSnapshot,
}
