use std::{sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle, time::sleep};
use tracing::debug;

/// Advance interval applied when none is configured.
pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_millis(7000);

/// Invariant: `index < list.len()` whenever the list is non-empty.
#[derive(Debug, Default)]
struct RotationState {
    list: Vec<String>,
    index: usize,
}

/// Cycles a single "current" item through an ordered list on a fixed timer.
///
/// A sequencer starts idle. Supplying a non-empty list activates it at
/// `seed % len`, and every tick advances `(i + 1) % len`, wrapping forever.
/// The tick task belongs to the sequencer and stops only through
/// [`Rotator::stop`], which the owning screen calls on teardown.
pub struct Rotator {
    state: Arc<Mutex<RotationState>>,
    interval: Duration,
    tick_task: Mutex<Option<JoinHandle<()>>>,
}

impl Rotator {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(RotationState::default())),
            interval,
            tick_task: Mutex::new(None),
        }
    }

    /// Replace the rotation list.
    ///
    /// An empty list moves the sequencer to idle on the spot (no stale index
    /// survives); a non-empty list activates it at `seed % len`.
    pub async fn set_list(&self, list: Vec<String>, seed: usize) {
        let activated = {
            let mut state = self.state.lock().await;
            if list.is_empty() {
                *state = RotationState::default();
                false
            } else {
                state.index = seed % list.len();
                state.list = list;
                true
            }
        };
        if activated {
            self.ensure_ticking().await;
        }
    }

    /// The item under the cursor; absent while idle.
    pub async fn current(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.list.get(state.index).cloned()
    }

    /// Cancel the tick task. No tick fires after this returns.
    pub async fn stop(&self) {
        if let Some(task) = self.tick_task.lock().await.take() {
            task.abort();
        }
    }

    async fn ensure_ticking(&self) {
        let mut slot = self.tick_task.lock().await;
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let state = Arc::clone(&self.state);
        let interval = self.interval;
        *slot = Some(tokio::spawn(async move {
            loop {
                sleep(interval).await;
                let mut state = state.lock().await;
                if state.list.is_empty() {
                    continue;
                }
                state.index = (state.index + 1) % state.list.len();
            }
        }));
        debug!(
            interval_ms = interval.as_millis() as u64,
            "rotation ticking started"
        );
    }
}
