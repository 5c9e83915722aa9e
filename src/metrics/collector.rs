//! # Bounded-deadline metrics fan-out.
//!
//! ```text
//! snapshot(timeout)
//!   ├─► spawn collect() for source[0..N]  (JoinSet, one task per source)
//!   ├─► join_next() until all done or deadline
//!   ├─► abort whatever is still running
//!   └─► merge finished sources in enumeration order
//!          name seen before → overwrite value, keep position
//!          new name         → append
//! ```
//!
//! ## Rules
//! - A source missing the deadline is omitted and listed in `timed_out`; the
//!   snapshot is still a success.
//! - A panicking source is omitted and logged; other sources are unaffected.
//! - Nothing outlives the call: unfinished collections are aborted on return.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::protocol::Metric;

/// Producer of a group of metrics.
#[async_trait]
pub trait MetricsSource: Send + Sync + 'static {
    /// Stable source name, used in `timed_out` and events.
    fn name(&self) -> &str;

    /// Returns the current values. May take arbitrarily long; the collector bounds it.
    async fn collect(&self) -> Vec<Metric>;
}

/// Result of one collection round.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// Unique names, in first-seen order.
    pub metrics: Vec<Metric>,
    /// Sources that did not answer before the deadline.
    pub timed_out: Vec<String>,
}

enum Slot {
    Pending,
    Done(Vec<Metric>),
    Panicked,
}

/// Fans a snapshot request out to every source.
pub struct MetricsCollector {
    sources: Vec<Arc<dyn MetricsSource>>,
    bus: Bus,
}

impl MetricsCollector {
    /// Creates a collector over `sources`, in enumeration order.
    pub fn new(sources: Vec<Arc<dyn MetricsSource>>, bus: Bus) -> Self {
        Self { sources, bus }
    }

    /// Names of the sources in enumeration order.
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Collects from all sources, waiting at most `timeout` (`None` = no deadline).
    pub async fn snapshot(&self, timeout: Option<Duration>) -> MetricsSnapshot {
        let mut set = JoinSet::new();
        for (idx, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            set.spawn(async move {
                let res = std::panic::AssertUnwindSafe(source.collect())
                    .catch_unwind()
                    .await;
                (idx, res)
            });
        }

        let mut slots: Vec<Slot> = self.sources.iter().map(|_| Slot::Pending).collect();
        // A deadline past the end of the clock is no deadline.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        loop {
            let next = match deadline {
                Some(at) => match time::timeout_at(at, set.join_next()).await {
                    Ok(next) => next,
                    Err(_elapsed) => break,
                },
                None => set.join_next().await,
            };
            match next {
                Some(Ok((idx, Ok(metrics)))) => slots[idx] = Slot::Done(metrics),
                Some(Ok((idx, Err(panic)))) => {
                    tracing::error!(
                        source = self.sources[idx].name(),
                        info = %panic_message(&*panic),
                        "metrics source panicked"
                    );
                    slots[idx] = Slot::Panicked;
                }
                // Only reachable if the task was aborted, which happens after the loop.
                Some(Err(_join_err)) => {}
                None => break,
            }
        }
        set.abort_all();

        let mut snapshot = MetricsSnapshot::default();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (idx, slot) in slots.into_iter().enumerate() {
            match slot {
                Slot::Done(metrics) => {
                    for metric in metrics {
                        match index.get(&metric.name) {
                            Some(&at) => snapshot.metrics[at].value = metric.value,
                            None => {
                                index.insert(metric.name.clone(), snapshot.metrics.len());
                                snapshot.metrics.push(metric);
                            }
                        }
                    }
                }
                Slot::Pending => {
                    let name = self.sources[idx].name();
                    let mut ev = Event::new(EventKind::MetricsSourceTimedOut).with_subject(name);
                    if let Some(t) = timeout {
                        ev = ev.with_duration(t);
                    }
                    self.bus.publish(ev);
                    snapshot.timed_out.push(name.to_string());
                }
                Slot::Panicked => {}
            }
        }
        snapshot
    }
}
