//! # Agent configuration.
//!
//! Provides [`Config`], the centralized settings passed to [`Agent::builder`](crate::Agent::builder).
//!
//! ## Sentinel values
//! - `metrics_timeout = 0s` → GET_METRICS without a timeout waits for every source
//! - `bus_capacity = 0` → clamped to 1
//! - `page_size = 0` → clamped to 1

use std::time::Duration;

use crate::protocol::Flag;

/// Number of memory pages a single READ_FILE may return.
pub const READ_CAP_PAGES: u64 = 16;

/// Global configuration for the agent core.
///
/// ## Field semantics
/// - `grace`: maximum wait for containers to exit during [`Agent::shutdown`](crate::Agent::shutdown)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `page_size`: bytes per page; READ_FILE returns at most `16 × page_size`
/// - `metrics_timeout`: default GET_METRICS deadline (`0s` = none)
/// - `logging_level`: baseline verbosity when no override is active
/// - `max_logging_level`: highest level SET_LOGGING_LEVEL accepts
/// - `flags`: extra name/value pairs reported by GET_FLAGS
///
/// ## Notes
/// All fields are public. Prefer the accessors over checking sentinels inline.
#[derive(Clone, Debug)]
pub struct Config {
    pub grace: Duration,
    pub bus_capacity: usize,
    pub page_size: u64,
    pub metrics_timeout: Duration,
    pub logging_level: u32,
    pub max_logging_level: u32,
    pub flags: Vec<Flag>,
}

impl Config {
    /// Largest READ_FILE slice, in bytes.
    #[inline]
    pub fn read_cap(&self) -> u64 {
        self.page_size.max(1).saturating_mul(READ_CAP_PAGES)
    }

    /// Returns the default metrics deadline as an `Option`.
    ///
    /// - `None` → wait for every source
    /// - `Some(d)` → omit sources slower than `d`
    #[inline]
    pub fn default_metrics_timeout(&self) -> Option<Duration> {
        if self.metrics_timeout == Duration::ZERO {
            None
        } else {
            Some(self.metrics_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Flags describing this configuration, followed by the user flags.
    pub fn as_flags(&self) -> Vec<Flag> {
        let mut flags = vec![
            Flag::new("grace", format!("{}s", self.grace.as_secs_f64())),
            Flag::new("bus_capacity", self.bus_capacity.to_string()),
            Flag::new("page_size", self.page_size.to_string()),
            Flag::new("metrics_timeout", format!("{}s", self.metrics_timeout.as_secs_f64())),
            Flag::new("logging_level", self.logging_level.to_string()),
            Flag::new("max_logging_level", self.max_logging_level.to_string()),
        ];
        flags.extend(self.flags.iter().cloned());
        flags
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`
    /// - `page_size = 4096` (64 KiB read cap)
    /// - `metrics_timeout = 5s`
    /// - `logging_level = 0`, `max_logging_level = 3`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
            page_size: 4096,
            metrics_timeout: Duration::from_secs(5),
            logging_level: 0,
            max_logging_level: 3,
            flags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_resolved_by_accessors() {
        let mut cfg = Config::default();
        assert_eq!(cfg.read_cap(), 16 * 4096);
        assert_eq!(cfg.default_metrics_timeout(), Some(Duration::from_secs(5)));

        cfg.metrics_timeout = Duration::ZERO;
        cfg.page_size = 0;
        cfg.bus_capacity = 0;
        assert_eq!(cfg.default_metrics_timeout(), None);
        assert_eq!(cfg.read_cap(), 16);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn user_flags_follow_config_flags() {
        let cfg = Config {
            flags: vec![Flag::new("work_dir", "/var/lib/agent")],
            ..Config::default()
        };
        let flags = cfg.as_flags();
        assert_eq!(flags[0].name, "grace");
        assert_eq!(flags.last(), Some(&Flag::new("work_dir", "/var/lib/agent")));
    }
}
