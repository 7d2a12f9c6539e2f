use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared start/stop switch observed by every automaton task.
///
/// The controller is intentionally coarse: a cleared flag does not say
/// whether the user stopped the run, a booking completed, or something
/// fatal happened. Loops re-check it after every blocking wait and before
/// every page interaction.
#[derive(Clone, Debug, Default)]
pub struct RunController {
    running: Arc<AtomicBool>,
}

impl RunController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set(&self, value: bool) {
        self.running.store(value, Ordering::SeqCst);
    }

    /// Flip the controller from stopped to running.
    ///
    /// Returns `false` when a run is already active. This is the guard
    /// against starting a second run; a plain `get` + `set` would race.
    pub fn try_start(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
