//! # Responses: the reply half of the agent protocol.
//!
//! Every successful call yields exactly one [`Response`] whose tag equals the
//! call's tag; failures are [`CallError`](crate::CallError)s instead.
//! Calls with no result body (SET_LOGGING_LEVEL, LAUNCH/KILL_NESTED_CONTAINER)
//! answer with an empty variant.

use serde::{Deserialize, Serialize};

use super::call::CallType;
use super::types::{ContainerStatus, FileInfo, Flag, Metric, VersionInfo};
use crate::tasks::{ExecutorSnapshot, FrameworkSnapshot, StateSnapshot, TaskSnapshot};

/// Successful call result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    GetHealth { healthy: bool },
    GetFlags { flags: Vec<Flag> },
    GetVersion { version_info: VersionInfo },
    GetMetrics { metrics: Vec<Metric> },
    GetLoggingLevel { level: u32 },
    SetLoggingLevel,
    ListFiles { file_infos: Vec<FileInfo> },
    ReadFile {
        /// Total file size, independent of the slice returned.
        size: u64,
        data: Vec<u8>,
    },
    GetState(StateSnapshot),
    GetContainers { containers: Vec<ContainerStatus> },
    GetFrameworks(FrameworkSnapshot),
    GetExecutors(ExecutorSnapshot),
    GetTasks(TaskSnapshot),
    LaunchNestedContainer,
    WaitNestedContainer {
        /// Absent when the container was killed by a signal or the cause is unknown.
        exit_status: Option<i32>,
    },
    KillNestedContainer,
}

impl Response {
    /// Returns the type tag of this response.
    pub fn call_type(&self) -> CallType {
        match self {
            Response::GetHealth { .. } => CallType::GetHealth,
            Response::GetFlags { .. } => CallType::GetFlags,
            Response::GetVersion { .. } => CallType::GetVersion,
            Response::GetMetrics { .. } => CallType::GetMetrics,
            Response::GetLoggingLevel { .. } => CallType::GetLoggingLevel,
            Response::SetLoggingLevel => CallType::SetLoggingLevel,
            Response::ListFiles { .. } => CallType::ListFiles,
            Response::ReadFile { .. } => CallType::ReadFile,
            Response::GetState(_) => CallType::GetState,
            Response::GetContainers { .. } => CallType::GetContainers,
            Response::GetFrameworks(_) => CallType::GetFrameworks,
            Response::GetExecutors(_) => CallType::GetExecutors,
            Response::GetTasks(_) => CallType::GetTasks,
            Response::LaunchNestedContainer => CallType::LaunchNestedContainer,
            Response::WaitNestedContainer { .. } => CallType::WaitNestedContainer,
            Response::KillNestedContainer => CallType::KillNestedContainer,
        }
    }
}
