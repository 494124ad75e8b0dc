use std::sync::atomic::{AtomicBool, Ordering};

/// Runtime switches flipped by chat commands and read by both watchers.
///
/// Shared as `Arc<Toggles>`. Each flag is read once per decision, so plain
/// atomics are enough even on the multi-threaded runtime.
#[derive(Debug, Default)]
pub struct Toggles {
    quiet: AtomicBool,
    travel_paused: AtomicBool,
}

impl Toggles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quiet mode: alerts are still posted but without an `@here` ping.
    pub fn is_quiet(&self) -> bool {
        self.quiet.load(Ordering::SeqCst)
    }

    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::SeqCst);
    }

    pub fn is_travel_paused(&self) -> bool {
        self.travel_paused.load(Ordering::SeqCst)
    }

    pub fn set_travel_paused(&self, paused: bool) {
        self.travel_paused.store(paused, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_loud_and_tracking() {
        let toggles = Toggles::new();
        assert!(!toggles.is_quiet());
        assert!(!toggles.is_travel_paused());
    }

    #[test]
    fn flags_are_independent() {
        let toggles = Toggles::new();
        toggles.set_quiet(true);
        assert!(toggles.is_quiet());
        assert!(!toggles.is_travel_paused());

        toggles.set_travel_paused(true);
        toggles.set_quiet(false);
        assert!(!toggles.is_quiet());
        assert!(toggles.is_travel_paused());
    }
}
