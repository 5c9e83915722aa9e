//! # External collaborators answering the plumbing calls.
//!
//! - [`AgentInfo`] backs GET_HEALTH, GET_FLAGS and GET_VERSION.
//! - [`FileBrowser`] backs LIST_FILES and READ_FILE.
//!
//! The agent only routes to these; what "healthy" means or where files live is
//! up to the embedder.

use async_trait::async_trait;

use super::config::Config;
use crate::error::BackendError;
use crate::protocol::{FileInfo, Flag, VersionInfo};

/// Health, flags and version accessor.
#[async_trait]
pub trait AgentInfo: Send + Sync + 'static {
    async fn health(&self) -> bool;
    async fn flags(&self) -> Vec<Flag>;
    async fn version(&self) -> VersionInfo;
}

/// Fixed answers derived from [`Config`] and the crate version.
#[derive(Clone, Debug)]
pub struct StaticInfo {
    flags: Vec<Flag>,
    version: VersionInfo,
}

impl StaticInfo {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            flags: cfg.as_flags(),
            version: VersionInfo {
                version: env!("CARGO_PKG_VERSION").to_string(),
                build_date: None,
                git_sha: None,
            },
        }
    }

    /// Overrides the reported version.
    pub fn with_version(mut self, version: VersionInfo) -> Self {
        self.version = version;
        self
    }
}

#[async_trait]
impl AgentInfo for StaticInfo {
    async fn health(&self) -> bool {
        true
    }

    async fn flags(&self) -> Vec<Flag> {
        self.flags.clone()
    }

    async fn version(&self) -> VersionInfo {
        self.version.clone()
    }
}

/// File listing and reading.
#[async_trait]
pub trait FileBrowser: Send + Sync + 'static {
    /// Lists the entries under `path`. `BackendError::Unknown` means no such path.
    async fn list(&self, path: &str) -> Result<Vec<FileInfo>, BackendError>;

    /// Reads at most `length` bytes from `offset`.
    ///
    /// Returns the full file size and the bytes read; `length` is already capped.
    async fn read(&self, path: &str, offset: u64, length: u64) -> Result<(u64, Vec<u8>), BackendError>;
}

/// Browser with no files; every path is unknown.
#[derive(Debug, Default)]
pub struct NoFiles;

#[async_trait]
impl FileBrowser for NoFiles {
    async fn list(&self, path: &str) -> Result<Vec<FileInfo>, BackendError> {
        Err(BackendError::Unknown {
            what: format!("path '{path}'"),
        })
    }

    async fn read(&self, path: &str, _offset: u64, _length: u64) -> Result<(u64, Vec<u8>), BackendError> {
        Err(BackendError::Unknown {
            what: format!("path '{path}'"),
        })
    }
}
