//! Request sequencing for route computations.
//!
//! Sequence numbers start at 1 and increase with every request. A completed
//! request is applied only when its number is higher than anything applied
//! before and above the invalidation floor:
//!
//! ```text
//! issue A(1), issue B(2)
//! B completes → 2 > 0 → applied
//! A completes → 1 < 2 → discarded
//! ```
//!
//! An older request that completes while a newer one is still pending may
//! still be applied; it is replaced as soon as the newer one lands.

/// Issues and arbitrates route request sequence numbers.
#[derive(Debug, Clone, Default)]
pub struct RouteSequencer {
    issued: u64,
    applied: u64,
    floor: u64,
}

impl RouteSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next sequence number.
    pub fn next(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Decides whether a completed request may be applied, recording it if so.
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq <= self.floor || seq <= self.applied || seq > self.issued {
            return false;
        }
        self.applied = seq;
        true
    }

    /// Makes every request issued so far unappliable.
    pub fn invalidate(&mut self) {
        self.floor = self.issued;
    }

    /// Highest sequence number issued.
    pub fn latest_issued(&self) -> u64 {
        self.issued
    }

    /// Highest sequence number applied (0 when none).
    pub fn latest_applied(&self) -> u64 {
        self.applied
    }

    /// Number of requests that were issued after the last applied one.
    pub fn in_flight(&self) -> u64 {
        self.issued - self.applied.max(self.floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_numbers_increase() {
        let mut seq = RouteSequencer::new();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
        assert_eq!(seq.latest_issued(), 2);
    }

    #[test]
    fn test_stale_completion_after_newer_applied_is_rejected() {
        let mut seq = RouteSequencer::new();
        let a = seq.next();
        let b = seq.next();

        assert!(seq.accept(b));
        assert!(!seq.accept(a));
        assert_eq!(seq.latest_applied(), b);
    }

    #[test]
    fn test_in_order_completions_both_apply() {
        let mut seq = RouteSequencer::new();
        let a = seq.next();
        let b = seq.next();

        assert!(seq.accept(a));
        assert!(seq.accept(b));
    }

    #[test]
    fn test_duplicate_completion_rejected() {
        let mut seq = RouteSequencer::new();
        let a = seq.next();
        assert!(seq.accept(a));
        assert!(!seq.accept(a));
    }

    #[test]
    fn test_unissued_sequence_rejected() {
        let mut seq = RouteSequencer::new();
        assert!(!seq.accept(1));
        assert_eq!(seq.latest_applied(), 0);
    }

    #[test]
    fn test_invalidate_rejects_everything_in_flight() {
        let mut seq = RouteSequencer::new();
        let a = seq.next();
        let b = seq.next();
        assert_eq!(seq.in_flight(), 2);

        seq.invalidate();
        assert_eq!(seq.in_flight(), 0);
        assert!(!seq.accept(a));
        assert!(!seq.accept(b));

        // Requests issued afterwards are unaffected
        let c = seq.next();
        assert!(seq.accept(c));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_applied_sequence_strictly_increases(
                order in Just((1u64..=8).collect::<Vec<_>>()).prop_shuffle()
            ) {
                let mut seq = RouteSequencer::new();
                for _ in 0..8 {
                    seq.next();
                }

                let mut last_applied = 0;
                for s in order {
                    if seq.accept(s) {
                        prop_assert!(s > last_applied);
                        last_applied = s;
                    }
                }
                // The newest request always wins eventually
                prop_assert_eq!(seq.latest_applied(), 8);
            }
        }
    }
}
