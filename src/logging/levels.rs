//! # Temporary logging-level overrides.
//!
//! [`LoggingLevels`] applies a verbosity level for a bounded time and then
//! restores the level that was in effect before the **first** override.
//!
//! ## Flow
//! ```text
//! set(L1, D1)   no override  → original = baseline, apply L1, arm timer #1
//! set(L2, D2)   override on  → original kept,       apply L2, cancel #1, arm timer #2
//! timer #2 fires             → apply original, clear override
//! ```
//!
//! ## Rules
//! - Each override owns a child [`CancellationToken`]; replacing the override
//!   cancels it, so a superseded timer never fires.
//! - Timers also carry a generation number, checked under the lock, which covers
//!   a timer that woke up just as it was being replaced.
//! - `set` returns as soon as the level is applied; it never waits on the duration.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::verbosity::VerbositySink;
use crate::error::CallError;
use crate::events::{Bus, Event, EventKind};

/// Active override.
struct Override {
    current: u32,
    original: u32,
    revert: CancellationToken,
    generation: u64,
}

#[derive(Default)]
struct State {
    active: Option<Override>,
    generation: u64,
}

/// Logging-level controller.
pub struct LoggingLevels {
    baseline: u32,
    max: u32,
    state: Arc<Mutex<State>>,
    sink: Arc<dyn VerbositySink>,
    bus: Bus,
    runtime_token: CancellationToken,
}

impl LoggingLevels {
    /// Creates a controller running at `baseline`, accepting levels up to `max`.
    ///
    /// Revert timers are children of `runtime_token`.
    pub fn new(
        baseline: u32,
        max: u32,
        sink: Arc<dyn VerbositySink>,
        bus: Bus,
        runtime_token: CancellationToken,
    ) -> Self {
        Self {
            baseline,
            max,
            state: Arc::new(Mutex::new(State::default())),
            sink,
            bus,
            runtime_token,
        }
    }

    /// Returns the level in effect.
    pub async fn get(&self) -> u32 {
        self.state
            .lock()
            .await
            .active
            .as_ref()
            .map_or(self.baseline, |o| o.current)
    }

    /// Returns the level the next revert will restore, if an override is active.
    pub async fn pending_revert(&self) -> Option<u32> {
        self.state.lock().await.active.as_ref().map(|o| o.original)
    }

    /// Applies `level` for `duration`, then reverts.
    pub async fn set(&self, level: u32, duration: Duration) -> Result<(), CallError> {
        if level > self.max {
            return Err(CallError::invalid(format!(
                "logging level {level} is above the maximum {}",
                self.max
            )));
        }

        let mut state = self.state.lock().await;
        self.sink.apply(level).map_err(|e| {
            tracing::warn!(level, error = %e, "failed to apply logging level");
            e.into_call_error("apply logging level")
        })?;

        let original = match state.active.take() {
            Some(prev) => {
                prev.revert.cancel();
                prev.original
            }
            None => self.baseline,
        };
        state.generation += 1;
        let generation = state.generation;
        let revert = self.runtime_token.child_token();
        state.active = Some(Override {
            current: level,
            original,
            revert: revert.clone(),
            generation,
        });
        drop(state);

        self.spawn_revert(revert, generation, original, duration);
        self.bus.publish(
            Event::new(EventKind::LoggingLevelChanged)
                .with_level(level)
                .with_duration(duration),
        );
        Ok(())
    }

    fn spawn_revert(
        &self,
        token: CancellationToken,
        generation: u64,
        original: u32,
        duration: Duration,
    ) {
        let state = Arc::clone(&self.state);
        let sink = Arc::clone(&self.sink);
        let bus = self.bus.clone();

        tokio::spawn(async move {
            let sleep = time::sleep(duration);
            tokio::pin!(sleep);
            tokio::select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => return,
            }

            let mut state = state.lock().await;
            if state.active.as_ref().map(|o| o.generation) != Some(generation) {
                return;
            }
            if let Err(e) = sink.apply(original) {
                tracing::warn!(level = original, error = %e, "failed to revert logging level");
            }
            state.active = None;
            drop(state);

            bus.publish(Event::new(EventKind::LoggingLevelReverted).with_level(original));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        applied: StdMutex<Vec<u32>>,
    }

    impl VerbositySink for Recorder {
        fn apply(&self, level: u32) -> Result<(), BackendError> {
            self.applied.lock().unwrap().push(level);
            Ok(())
        }
    }

    struct Refusing;

    impl VerbositySink for Refusing {
        fn apply(&self, _level: u32) -> Result<(), BackendError> {
            Err(BackendError::failed("filter handle gone"))
        }
    }

    fn controller(sink: Arc<dyn VerbositySink>) -> LoggingLevels {
        LoggingLevels::new(0, 3, sink, Bus::new(16), CancellationToken::new())
    }

    #[tokio::test(start_paused = true)]
    async fn override_reverts_after_duration() {
        let sink = Arc::new(Recorder::default());
        let levels = controller(sink.clone());

        levels.set(2, Duration::from_secs(10)).await.unwrap();
        assert_eq!(levels.get().await, 2);
        assert_eq!(levels.pending_revert().await, Some(0));

        time::sleep(Duration::from_secs(9)).await;
        assert_eq!(levels.get().await, 2);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(levels.get().await, 0);
        assert_eq!(levels.pending_revert().await, None);
        assert_eq!(*sink.applied.lock().unwrap(), vec![2, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn chained_overrides_revert_to_first_original() {
        let sink = Arc::new(Recorder::default());
        let levels = controller(sink.clone());

        levels.set(1, Duration::from_secs(10)).await.unwrap();
        time::sleep(Duration::from_secs(5)).await;
        levels.set(3, Duration::from_secs(10)).await.unwrap();

        // The first timer would have fired at t=10s.
        time::sleep(Duration::from_secs(7)).await;
        assert_eq!(levels.get().await, 3);

        time::sleep(Duration::from_secs(4)).await;
        assert_eq!(levels.get().await, 0);
        assert_eq!(*sink.applied.lock().unwrap(), vec![1, 3, 0]);
    }

    #[tokio::test]
    async fn out_of_range_level_is_rejected() {
        let sink = Arc::new(Recorder::default());
        let levels = controller(sink.clone());
        let err = levels.set(4, Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.as_label(), "invalid_argument");
        assert!(sink.applied.lock().unwrap().is_empty());
        assert_eq!(levels.get().await, 0);
    }

    #[tokio::test]
    async fn sink_failure_is_internal_and_leaves_state() {
        let levels = controller(Arc::new(Refusing));
        let err = levels.set(1, Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, CallError::internal("apply logging level"));
        assert_eq!(levels.get().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn runtime_cancellation_stops_pending_revert() {
        let sink = Arc::new(Recorder::default());
        let token = CancellationToken::new();
        let levels = LoggingLevels::new(0, 3, sink.clone(), Bus::new(4), token.clone());

        levels.set(2, Duration::from_secs(1)).await.unwrap();
        token.cancel();
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*sink.applied.lock().unwrap(), vec![2]);
    }
}
