//! # Agent protocol model.
//!
//! - [`RawCall`] / [`Call`] - request as decoded, and after validation
//! - [`Response`] - successful result, tagged like the call
//! - shared payload types ([`ContainerId`], [`Metric`], [`FileInfo`], ...)
//!
//! The transport (HTTP, protobuf, JSON) is outside this crate; every type here
//! derives `serde` so any wire format can carry it.

mod call;
mod response;
mod types;

pub use call::{
    Call, CallType, GetMetrics, KillNestedContainer, LaunchNestedContainer, ListFiles, RawCall,
    ReadFile, SetLoggingLevel, WaitNestedContainer,
};
pub use response::Response;
pub use types::{
    CommandInfo, ContainerId, ContainerInfo, ContainerState, ContainerStatus, FileInfo, Flag,
    Metric, Resource, ResourceStatistics, VersionInfo,
};
