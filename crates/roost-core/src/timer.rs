//! Deadline tracking for pure state machines.
//!
//! State machines in this workspace never sleep; they record deadlines and
//! check them against the `now` passed into `tick`. These helpers keep
//! that bookkeeping out of the machines themselves.

use std::{collections::HashMap, hash::Hash};

/// A single re-armable deadline.
#[derive(Debug, Clone, Default)]
pub struct ExpiryTimer<I> {
    deadline: Option<I>,
}

impl<I: Copy + Ord> ExpiryTimer<I> {
    /// Create a disarmed timer.
    #[must_use]
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm (or re-arm) the timer. Re-arming replaces the old deadline.
    pub fn arm(&mut self, deadline: I) {
        self.deadline = Some(deadline);
    }

    /// Disarm the timer. Returns whether it was armed.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// True while a deadline is set.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if armed.
    #[must_use]
    pub fn deadline(&self) -> Option<I> {
        self.deadline
    }

    /// Check the deadline against `now`, disarming and returning `true`
    /// when it has passed. Fires at most once per arm.
    pub fn fire(&mut self, now: I) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            },
            _ => false,
        }
    }
}

/// A set of keyed deadlines, one per key.
///
/// Used for per-user typing expiry: each typing signal re-arms that
/// user's deadline, and `expire` drains every deadline that has passed.
#[derive(Debug, Clone)]
pub struct ExpiryMap<K, I> {
    deadlines: HashMap<K, I>,
}

impl<K, I> Default for ExpiryMap<K, I> {
    fn default() -> Self {
        Self { deadlines: HashMap::new() }
    }
}

impl<K: Eq + Hash + Copy, I: Copy + Ord> ExpiryMap<K, I> {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm or refresh the deadline for `key`.
    pub fn insert(&mut self, key: K, deadline: I) {
        self.deadlines.insert(key, deadline);
    }

    /// Cancel `key`'s deadline. Returns whether one was armed.
    pub fn remove(&mut self, key: &K) -> bool {
        self.deadlines.remove(key).is_some()
    }

    /// Whether `key` has a pending deadline.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.deadlines.contains_key(key)
    }

    /// Drain and return every key whose deadline has passed.
    pub fn expire(&mut self, now: I) -> Vec<K> {
        let expired: Vec<K> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            self.deadlines.remove(key);
        }
        expired
    }

    /// Number of pending deadlines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// True when no deadlines are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Drop every pending deadline.
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn timer_fires_once_per_arm() {
        let t0 = Instant::now();
        let mut timer = ExpiryTimer::new();
        assert!(!timer.fire(t0));

        timer.arm(t0 + Duration::from_secs(3));
        assert!(!timer.fire(t0 + Duration::from_secs(2)));
        assert!(timer.fire(t0 + Duration::from_secs(3)));
        assert!(!timer.fire(t0 + Duration::from_secs(10)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn rearm_replaces_deadline() {
        let t0 = Instant::now();
        let mut timer = ExpiryTimer::new();
        timer.arm(t0 + Duration::from_secs(3));
        timer.arm(t0 + Duration::from_secs(6));

        assert!(!timer.fire(t0 + Duration::from_secs(4)));
        assert!(timer.fire(t0 + Duration::from_secs(6)));
    }

    #[test]
    fn cancel_prevents_fire() {
        let t0 = Instant::now();
        let mut timer = ExpiryTimer::new();
        timer.arm(t0);
        assert!(timer.cancel());
        assert!(!timer.fire(t0 + Duration::from_secs(1)));
        assert!(!timer.cancel());
    }

    #[test]
    fn map_expires_only_passed_deadlines() {
        let t0 = Instant::now();
        let mut map: ExpiryMap<u64, Instant> = ExpiryMap::new();
        map.insert(1, t0 + Duration::from_secs(3));
        map.insert(2, t0 + Duration::from_secs(5));

        let mut expired = map.expire(t0 + Duration::from_secs(3));
        expired.sort_unstable();
        assert_eq!(expired, vec![1]);
        assert!(map.contains(&2));
        assert_eq!(map.expire(t0 + Duration::from_secs(5)), vec![2]);
        assert!(map.is_empty());
    }

    #[test]
    fn map_insert_refreshes_deadline() {
        let t0 = Instant::now();
        let mut map: ExpiryMap<u64, Instant> = ExpiryMap::new();
        map.insert(1, t0 + Duration::from_secs(3));
        map.insert(1, t0 + Duration::from_secs(6));

        assert!(map.expire(t0 + Duration::from_secs(4)).is_empty());
        assert_eq!(map.expire(t0 + Duration::from_secs(6)), vec![1]);
    }
}
