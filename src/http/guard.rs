//! Single-flight guard for session teardown.

use std::sync::atomic::{AtomicBool, Ordering};

/// Ensures the teardown + redirect side effects run once per failure episode.
///
/// The guard is armed while a session is considered valid (after login or
/// after hydrating a stored session). The first failure handler to trip it
/// wins and performs the side effects; every concurrent or later failure
/// observes a disarmed guard and absorbs silently. A user-initiated logout
/// disarms it for the same reason, so a request that was already in flight
/// cannot re-trigger teardown after the fact.
#[derive(Debug, Default)]
pub struct FailureGuard {
    armed: AtomicBool,
}

impl FailureGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm after a session becomes valid.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Disarm without tripping, e.g. on user-initiated logout.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    /// Atomically claim the current episode.
    ///
    /// Returns `true` for exactly one caller per armed episode.
    pub fn trip(&self) -> bool {
        self.armed.swap(false, Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn trips_once_per_armed_episode() {
        let guard = FailureGuard::new();
        assert!(!guard.trip()); // never armed

        guard.arm();
        assert!(guard.trip());
        assert!(!guard.trip());

        guard.arm();
        assert!(guard.trip());
    }

    #[test]
    fn disarm_absorbs_later_trips() {
        let guard = FailureGuard::new();
        guard.arm();
        guard.disarm();
        assert!(!guard.trip());
    }

    #[test]
    fn concurrent_trips_yield_a_single_winner() {
        let guard = Arc::new(FailureGuard::new());
        guard.arm();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                std::thread::spawn(move || usize::from(guard.trip()))
            })
            .collect();

        let winners: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(winners, 1);
    }
}
