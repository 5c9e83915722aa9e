//! Shared payload types of the agent protocol.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Container identity.
///
/// Nested containers reference their parent by value; the tree is resolved by
/// lookups in the container table, never by pointers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId {
    /// Unique (per agent lifetime) identifier, usually a UUIDv4 string.
    pub value: String,
    /// Parent container, absent for top-level containers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<ContainerId>>,
}

impl ContainerId {
    /// Creates a top-level id.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            parent: None,
        }
    }

    /// Creates an id nested under `parent`.
    pub fn nested(value: impl Into<String>, parent: ContainerId) -> Self {
        Self {
            value: value.into(),
            parent: Some(Box::new(parent)),
        }
    }

    /// Creates a fresh UUIDv4 id, optionally nested under `parent`.
    pub fn generate(parent: Option<ContainerId>) -> Self {
        Self {
            value: Uuid::new_v4().to_string(),
            parent: parent.map(Box::new),
        }
    }

    /// Returns the parent id, if any.
    pub fn parent(&self) -> Option<&ContainerId> {
        self.parent.as_deref()
    }

    /// Validates the value: non-empty and limited to `[A-Za-z0-9_-]`
    /// on every level of the chain. `.` is reserved as the path separator.
    pub(crate) fn validate(&self) -> Result<(), String> {
        let mut cur = Some(self);
        while let Some(id) = cur {
            if id.value.is_empty() {
                return Err("container id value must not be empty".into());
            }
            if let Some(c) = id
                .value
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_')))
            {
                return Err(format!("container id '{}' contains '{c}'", id.value));
            }
            cur = id.parent();
        }
        Ok(())
    }
}

impl fmt::Display for ContainerId {
    /// Dotted path from the root, e.g. `executor.child.grandchild`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = self.parent() {
            write!(f, "{parent}.")?;
        }
        f.write_str(&self.value)
    }
}

/// Command to run inside a container. Forwarded to the backend verbatim.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandInfo {
    /// Shell command or executable path.
    pub value: Option<String>,
    /// Arguments when `shell` is false.
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Run `value` through `/bin/sh -c`.
    #[serde(default = "default_shell")]
    pub shell: bool,
    /// Extra environment variables.
    #[serde(default)]
    pub environment: Vec<(String, String)>,
}

fn default_shell() -> bool {
    true
}

/// Container image/isolation settings. Forwarded to the backend verbatim.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Image reference, absent for the host filesystem.
    pub image: Option<String>,
    /// Hostname inside the container.
    pub hostname: Option<String>,
}

/// Scalar resource (e.g. `cpus: 0.5`, `mem: 128`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource name.
    pub name: String,
    /// Scalar amount.
    pub value: f64,
}

impl Resource {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Resource usage snapshot reported by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatistics {
    /// Seconds since epoch when the sample was taken.
    pub timestamp: f64,
    pub cpus_user_time_secs: Option<f64>,
    pub cpus_system_time_secs: Option<f64>,
    pub mem_rss_bytes: Option<u64>,
    pub processes: Option<u32>,
}

/// Lifecycle state of a nested container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerState {
    /// Launch dispatched, backend has not accepted it yet.
    Creating,
    /// Backend accepted the launch.
    Running,
    /// Terminal; carries the exit status (absent = signal or unknown cause).
    Terminated(Option<i32>),
}

impl ContainerState {
    #[inline]
    pub fn is_terminated(&self) -> bool {
        matches!(self, ContainerState::Terminated(_))
    }

    /// Exit status if terminated.
    #[inline]
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            ContainerState::Terminated(status) => *status,
            _ => None,
        }
    }
}

/// One row of GET_CONTAINERS.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub container_id: ContainerId,
    pub state: ContainerState,
    /// Set once terminated; absent while running or when killed by a signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<i32>,
    pub resources: Vec<Resource>,
    /// Backend usage sample; only for running containers whose backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ResourceStatistics>,
}

/// Agent command-line/config flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub name: String,
    pub value: String,
}

impl Flag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Build information of the agent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub build_date: Option<String>,
    pub git_sha: Option<String>,
}

/// Named numeric metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Entry returned by LIST_FILES.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub size: u64,
    /// Unix mode bits.
    pub mode: Option<u32>,
    /// Modification time, seconds since epoch.
    pub mtime: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_dotted_path() {
        let root = ContainerId::new("exec");
        let child = ContainerId::nested("c1", root.clone());
        let grandchild = ContainerId::nested("c2", child);
        assert_eq!(root.to_string(), "exec");
        assert_eq!(grandchild.to_string(), "exec.c1.c2");
    }

    #[test]
    fn generated_ids_are_unique_and_valid() {
        let a = ContainerId::generate(None);
        let b = ContainerId::generate(Some(a.clone()));
        assert_ne!(a.value, b.value);
        assert!(b.validate().is_ok());
        assert_eq!(b.parent(), Some(&a));
    }

    #[test]
    fn validation_rejects_bad_characters_anywhere_in_chain() {
        assert!(ContainerId::new("").validate().is_err());
        let bad_parent = ContainerId::nested("ok", ContainerId::new("no/slash"));
        assert!(bad_parent.validate().is_err());
    }

    #[test]
    fn dotted_values_are_rejected() {
        let flat = ContainerId::new("a.b");
        let nested = ContainerId::nested("b", ContainerId::new("a"));
        assert_eq!(flat.to_string(), nested.to_string());
        assert!(flat.validate().is_err());
        assert!(nested.validate().is_ok());
    }
}
