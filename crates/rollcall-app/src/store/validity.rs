use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::clock::Clock;

/// Last successful fetch per partition, checked against a fixed TTL.
pub struct ValidityTracker<P> {
    stamps: HashMap<P, OffsetDateTime>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<P: Eq + Hash> ValidityTracker<P> {
    /// Tracker expiring partitions `ttl` after their last fetch.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            stamps: HashMap::new(),
            ttl,
            clock,
        }
    }

    /// Lifetime of a fresh partition.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Record a successful fetch now.
    pub fn mark_fresh(&mut self, partition: P) {
        self.stamps.insert(partition, self.clock.now());
    }

    /// Whether the partition was fetched less than one TTL ago.
    pub fn is_valid(&self, partition: &P) -> bool {
        self.stamps
            .get(partition)
            .is_some_and(|fetched| self.clock.now() - *fetched < self.ttl)
    }

    /// When the partition was last fetched.
    pub fn last_fetched(&self, partition: &P) -> Option<OffsetDateTime> {
        self.stamps.get(partition).copied()
    }

    /// Forget the partition's fetch time.
    pub fn invalidate(&mut self, partition: &P) {
        self.stamps.remove(partition);
    }

    /// Forget every fetch time.
    pub fn clear(&mut self) {
        self.stamps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn fresh_until_ttl_elapses() {
        let clock = Arc::new(ManualClock::default());
        let mut tracker = ValidityTracker::new(Duration::minutes(3), clock.clone());
        assert!(!tracker.is_valid(&"group"));

        tracker.mark_fresh("group");
        assert!(tracker.is_valid(&"group"));

        clock.advance(Duration::minutes(3) - Duration::seconds(1));
        assert!(tracker.is_valid(&"group"));

        clock.advance(Duration::seconds(1));
        assert!(!tracker.is_valid(&"group"));
    }

    #[test]
    fn invalidate_forgets_the_stamp() {
        let clock = Arc::new(ManualClock::default());
        let mut tracker = ValidityTracker::new(Duration::minutes(5), clock);
        tracker.mark_fresh(1_u8);
        tracker.mark_fresh(2_u8);
        tracker.invalidate(&1);
        assert!(!tracker.is_valid(&1));
        assert!(tracker.last_fetched(&1).is_none());
        assert!(tracker.is_valid(&2));
        tracker.clear();
        assert!(!tracker.is_valid(&2));
    }
}
