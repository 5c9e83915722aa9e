//! # Calls: the request half of the agent protocol.
//!
//! A call arrives from the transport as a [`RawCall`]: a `type` tag plus a set of
//! optional payload fields, exactly as decoded. [`Call::try_from`] validates that
//! the payload matching the tag is present and every other payload is absent,
//! producing the [`Call`] sum type the dispatcher routes on.
//!
//! ## Validation
//! ```text
//! RawCall { type: None, .. }                          → InvalidArgument
//! RawCall { type: UNKNOWN, .. }                       → InvalidArgument
//! RawCall { type: KILL_NESTED_CONTAINER, kill: None } → InvalidArgument (missing)
//! RawCall { type: GET_HEALTH, read_file: Some(..) }   → InvalidArgument (stray payload)
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{CommandInfo, ContainerId, ContainerInfo, Resource};
use crate::error::CallError;

/// Type tag shared by calls and responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallType {
    GetHealth,
    GetFlags,
    GetVersion,
    GetMetrics,
    GetLoggingLevel,
    SetLoggingLevel,
    ListFiles,
    ReadFile,
    GetState,
    GetContainers,
    GetFrameworks,
    GetExecutors,
    GetTasks,
    LaunchNestedContainer,
    WaitNestedContainer,
    KillNestedContainer,
    /// Any tag this agent does not understand.
    #[serde(other)]
    Unknown,
}

impl CallType {
    /// Wire name of the tag (e.g. `GET_HEALTH`).
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Unknown => "UNKNOWN",
            CallType::GetHealth => "GET_HEALTH",
            CallType::GetFlags => "GET_FLAGS",
            CallType::GetVersion => "GET_VERSION",
            CallType::GetMetrics => "GET_METRICS",
            CallType::GetLoggingLevel => "GET_LOGGING_LEVEL",
            CallType::SetLoggingLevel => "SET_LOGGING_LEVEL",
            CallType::ListFiles => "LIST_FILES",
            CallType::ReadFile => "READ_FILE",
            CallType::GetState => "GET_STATE",
            CallType::GetContainers => "GET_CONTAINERS",
            CallType::GetFrameworks => "GET_FRAMEWORKS",
            CallType::GetExecutors => "GET_EXECUTORS",
            CallType::GetTasks => "GET_TASKS",
            CallType::LaunchNestedContainer => "LAUNCH_NESTED_CONTAINER",
            CallType::WaitNestedContainer => "WAIT_NESTED_CONTAINER",
            CallType::KillNestedContainer => "KILL_NESTED_CONTAINER",
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GET_METRICS payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetMetrics {
    /// Collection deadline; the agent default applies when absent.
    pub timeout: Option<Duration>,
}

/// SET_LOGGING_LEVEL payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetLoggingLevel {
    pub level: u32,
    pub duration: Duration,
}

/// LIST_FILES payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListFiles {
    pub path: String,
}

/// READ_FILE payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadFile {
    pub path: String,
    #[serde(default)]
    pub offset: u64,
    /// Capped by the agent's read limit; absent means "up to the limit".
    pub length: Option<u64>,
}

/// LAUNCH_NESTED_CONTAINER payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaunchNestedContainer {
    pub container_id: ContainerId,
    pub command: Option<CommandInfo>,
    pub container: Option<ContainerInfo>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// WAIT_NESTED_CONTAINER payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaitNestedContainer {
    pub container_id: ContainerId,
}

/// KILL_NESTED_CONTAINER payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KillNestedContainer {
    pub container_id: ContainerId,
}

/// Call as decoded by the transport, before validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCall {
    #[serde(rename = "type")]
    pub call_type: Option<CallType>,
    pub get_metrics: Option<GetMetrics>,
    pub set_logging_level: Option<SetLoggingLevel>,
    pub list_files: Option<ListFiles>,
    pub read_file: Option<ReadFile>,
    pub launch_nested_container: Option<LaunchNestedContainer>,
    pub wait_nested_container: Option<WaitNestedContainer>,
    pub kill_nested_container: Option<KillNestedContainer>,
}

impl RawCall {
    /// Bare call carrying only a tag.
    pub fn of(call_type: CallType) -> Self {
        Self {
            call_type: Some(call_type),
            ..Self::default()
        }
    }

    /// Tags of the payload fields that are set.
    fn present(&self) -> Vec<CallType> {
        let mut set = Vec::new();
        if self.get_metrics.is_some() {
            set.push(CallType::GetMetrics);
        }
        if self.set_logging_level.is_some() {
            set.push(CallType::SetLoggingLevel);
        }
        if self.list_files.is_some() {
            set.push(CallType::ListFiles);
        }
        if self.read_file.is_some() {
            set.push(CallType::ReadFile);
        }
        if self.launch_nested_container.is_some() {
            set.push(CallType::LaunchNestedContainer);
        }
        if self.wait_nested_container.is_some() {
            set.push(CallType::WaitNestedContainer);
        }
        if self.kill_nested_container.is_some() {
            set.push(CallType::KillNestedContainer);
        }
        set
    }
}

/// Validated call; one variant per tag.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    GetHealth,
    GetFlags,
    GetVersion,
    GetMetrics(GetMetrics),
    GetLoggingLevel,
    SetLoggingLevel(SetLoggingLevel),
    ListFiles(ListFiles),
    ReadFile(ReadFile),
    GetState,
    GetContainers,
    GetFrameworks,
    GetExecutors,
    GetTasks,
    LaunchNestedContainer(LaunchNestedContainer),
    WaitNestedContainer(WaitNestedContainer),
    KillNestedContainer(KillNestedContainer),
}

impl Call {
    /// Returns the type tag of this call.
    pub fn call_type(&self) -> CallType {
        match self {
            Call::GetHealth => CallType::GetHealth,
            Call::GetFlags => CallType::GetFlags,
            Call::GetVersion => CallType::GetVersion,
            Call::GetMetrics(_) => CallType::GetMetrics,
            Call::GetLoggingLevel => CallType::GetLoggingLevel,
            Call::SetLoggingLevel(_) => CallType::SetLoggingLevel,
            Call::ListFiles(_) => CallType::ListFiles,
            Call::ReadFile(_) => CallType::ReadFile,
            Call::GetState => CallType::GetState,
            Call::GetContainers => CallType::GetContainers,
            Call::GetFrameworks => CallType::GetFrameworks,
            Call::GetExecutors => CallType::GetExecutors,
            Call::GetTasks => CallType::GetTasks,
            Call::LaunchNestedContainer(_) => CallType::LaunchNestedContainer,
            Call::WaitNestedContainer(_) => CallType::WaitNestedContainer,
            Call::KillNestedContainer(_) => CallType::KillNestedContainer,
        }
    }
}

fn required<T>(payload: Option<T>, tag: CallType) -> Result<T, CallError> {
    payload.ok_or_else(|| CallError::invalid(format!("{tag} call is missing its payload")))
}

impl TryFrom<RawCall> for Call {
    type Error = CallError;

    fn try_from(raw: RawCall) -> Result<Self, Self::Error> {
        let tag = raw
            .call_type
            .ok_or_else(|| CallError::invalid("call type is missing"))?;
        if let Some(stray) = raw.present().into_iter().find(|t| *t != tag) {
            return Err(CallError::invalid(format!(
                "{tag} call carries a {stray} payload"
            )));
        }

        let call = match tag {
            CallType::Unknown => return Err(CallError::invalid("unknown call type")),
            CallType::GetHealth => Call::GetHealth,
            CallType::GetFlags => Call::GetFlags,
            CallType::GetVersion => Call::GetVersion,
            CallType::GetMetrics => Call::GetMetrics(raw.get_metrics.unwrap_or_default()),
            CallType::GetLoggingLevel => Call::GetLoggingLevel,
            CallType::SetLoggingLevel => {
                Call::SetLoggingLevel(required(raw.set_logging_level, tag)?)
            }
            CallType::ListFiles => Call::ListFiles(required(raw.list_files, tag)?),
            CallType::ReadFile => Call::ReadFile(required(raw.read_file, tag)?),
            CallType::GetState => Call::GetState,
            CallType::GetContainers => Call::GetContainers,
            CallType::GetFrameworks => Call::GetFrameworks,
            CallType::GetExecutors => Call::GetExecutors,
            CallType::GetTasks => Call::GetTasks,
            CallType::LaunchNestedContainer => {
                Call::LaunchNestedContainer(required(raw.launch_nested_container, tag)?)
            }
            CallType::WaitNestedContainer => {
                Call::WaitNestedContainer(required(raw.wait_nested_container, tag)?)
            }
            CallType::KillNestedContainer => {
                Call::KillNestedContainer(required(raw.kill_nested_container, tag)?)
            }
        };
        Ok(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kill(value: &str) -> KillNestedContainer {
        KillNestedContainer {
            container_id: ContainerId::new(value),
        }
    }

    #[test]
    fn missing_or_unknown_tag_is_invalid() {
        let err = Call::try_from(RawCall::default()).unwrap_err();
        assert_eq!(err.as_label(), "invalid_argument");

        let err = Call::try_from(RawCall::of(CallType::Unknown)).unwrap_err();
        assert_eq!(err.as_label(), "invalid_argument");
    }

    #[test]
    fn missing_payload_is_invalid() {
        let err = Call::try_from(RawCall::of(CallType::KillNestedContainer)).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn stray_payload_is_invalid() {
        let raw = RawCall {
            kill_nested_container: Some(kill("c1")),
            ..RawCall::of(CallType::GetHealth)
        };
        let err = Call::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("KILL_NESTED_CONTAINER"));

        let raw = RawCall {
            kill_nested_container: Some(kill("c1")),
            wait_nested_container: Some(WaitNestedContainer {
                container_id: ContainerId::new("c1"),
            }),
            ..RawCall::of(CallType::KillNestedContainer)
        };
        assert!(Call::try_from(raw).is_err());
    }

    #[test]
    fn matching_payload_is_accepted() {
        let raw = RawCall {
            kill_nested_container: Some(kill("c1")),
            ..RawCall::of(CallType::KillNestedContainer)
        };
        let call = Call::try_from(raw).unwrap();
        assert_eq!(call.call_type(), CallType::KillNestedContainer);
    }

    #[test]
    fn get_metrics_payload_is_optional() {
        let call = Call::try_from(RawCall::of(CallType::GetMetrics)).unwrap();
        assert_eq!(call, Call::GetMetrics(GetMetrics { timeout: None }));
    }

    #[test]
    fn decodes_unknown_tag_strings() {
        let raw: RawCall = serde_json::from_str(r#"{"type":"TELEPORT"}"#).unwrap();
        assert_eq!(raw.call_type, Some(CallType::Unknown));
        assert_eq!(Call::try_from(raw).unwrap_err().as_label(), "invalid_argument");

        let raw: RawCall = serde_json::from_str(
            r#"{"type":"WAIT_NESTED_CONTAINER",
                "wait_nested_container":{"container_id":{"value":"c1","parent":{"value":"e1"}}}}"#,
        )
        .unwrap();
        let Call::WaitNestedContainer(wait) = Call::try_from(raw).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(wait.container_id.to_string(), "e1.c1");
    }
}
