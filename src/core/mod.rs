//! Agent core: dispatch, wiring and configuration.
//!
//! The public API from this module is [`Agent`] (call dispatch and shutdown),
//! [`AgentBuilder`], [`Config`] and the plumbing collaborator traits.
//!
//! Internal modules:
//! - [`agent`]: routes calls to components, subscriber listener, shutdown;
//! - [`builder`]: wires components and defaults;
//! - [`collaborators`]: health/flags/version and file access seams;
//! - [`config`]: settings and sentinel accessors.

mod agent;
mod builder;
mod collaborators;
mod config;

pub use agent::Agent;
pub use builder::AgentBuilder;
pub use collaborators::{AgentInfo, FileBrowser, NoFiles, StaticInfo};
pub use config::{Config, READ_CAP_PAGES};
