//! Debounce / stability filter applied to decoded raw indices.
//!
//! One [`DebouncePolicy`] is chosen for the whole process and every control
//! runs its samples through a [`DebounceFilter`] built from it:
//!
//! *   [`DebouncePolicy::EdgeCompare`] commits a sample as soon as it differs
//!     from the last committed value. A glitch that has already resolved back
//!     to the committed value when the handler reads the lines produces
//!     nothing.
//! *   [`DebouncePolicy::Settle`] arms a deferred re-sample when a sample
//!     differs, and commits only if the re-sample taken `interval` later
//!     matches. An edge whose sample equals the pending value keeps the armed
//!     timer; an edge with a different sample re-arms with a fresh token, so
//!     timers armed for an earlier sample are ignored when they fire.
//!
//! In both modes a group that never stabilizes keeps its last committed
//! value.

use log::trace;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebouncePolicy {
    #[default]
    EdgeCompare,
    Settle {
        interval: Duration,
    },
}

/// What the caller must do after feeding a sample to the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// A new stable value; publish it.
    Commit(u32),
    /// Nothing changed.
    Unchanged,
    /// Re-sample after `delay` and hand the result to
    /// [`DebounceFilter::on_settle`] together with `token`.
    Rearm { delay: Duration, token: u64 },
}

#[derive(Debug, Clone)]
pub struct DebounceFilter {
    policy: DebouncePolicy,
    committed: Option<u32>,
    pending: Option<u32>,
    token: u64,
}

impl DebounceFilter {
    pub fn new(policy: DebouncePolicy) -> Self {
        Self {
            policy,
            committed: None,
            pending: None,
            token: 0,
        }
    }

    pub fn policy(&self) -> DebouncePolicy {
        self.policy
    }

    /// Last committed raw index, if any.
    pub fn committed(&self) -> Option<u32> {
        self.committed
    }

    /// Seeds the committed value from a startup sample.
    pub fn prime(&mut self, raw: u32) {
        self.committed = Some(raw);
        self.pending = None;
    }

    /// Commits `raw` unconditionally, dropping any armed re-sample. Used by
    /// simulated input, which has no bounce to filter.
    pub fn force(&mut self, raw: u32) {
        self.prime(raw);
        self.token = self.token.wrapping_add(1);
    }

    /// Feeds a sample taken in response to an edge.
    pub fn on_sample(&mut self, raw: u32) -> FilterOutcome {
        if self.committed == Some(raw) {
            if self.pending.take().is_some() {
                // The armed timer must not commit a value that already bounced away
                self.token = self.token.wrapping_add(1);
            }
            trace!("debounce: raw {} equals committed value", raw);
            return FilterOutcome::Unchanged;
        }
        match self.policy {
            DebouncePolicy::EdgeCompare => {
                self.committed = Some(raw);
                FilterOutcome::Commit(raw)
            }
            DebouncePolicy::Settle { .. } if self.pending == Some(raw) => {
                // The armed timer already covers this value
                trace!("debounce: raw {} already pending", raw);
                FilterOutcome::Unchanged
            }
            DebouncePolicy::Settle { interval } => {
                self.pending = Some(raw);
                self.token = self.token.wrapping_add(1);
                trace!("debounce: raw {} pending, token {}", raw, self.token);
                FilterOutcome::Rearm {
                    delay: interval,
                    token: self.token,
                }
            }
        }
    }

    /// Feeds the re-sample taken when a settle timer fires.
    pub fn on_settle(&mut self, token: u64, raw: u32) -> FilterOutcome {
        if token != self.token || self.pending.is_none() {
            trace!("debounce: stale settle token {}", token);
            return FilterOutcome::Unchanged;
        }
        if self.pending == Some(raw) {
            self.pending = None;
            if self.committed == Some(raw) {
                return FilterOutcome::Unchanged;
            }
            self.committed = Some(raw);
            return FilterOutcome::Commit(raw);
        }
        // Still moving: compare the next re-sample against this one
        self.on_sample(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTLE: DebouncePolicy = DebouncePolicy::Settle {
        interval: Duration::from_millis(10),
    };

    #[test]
    fn test_edge_compare_commits_once_per_change() {
        let mut f = DebounceFilter::new(DebouncePolicy::EdgeCompare);
        f.prime(0);
        assert_eq!(f.on_sample(0), FilterOutcome::Unchanged);
        assert_eq!(f.on_sample(3), FilterOutcome::Commit(3));
        for _ in 0..5 {
            assert_eq!(f.on_sample(3), FilterOutcome::Unchanged);
        }
        assert_eq!(f.committed(), Some(3));
    }

    #[test]
    fn test_settle_requires_matching_resample() {
        let mut f = DebounceFilter::new(SETTLE);
        f.prime(1);
        let token = match f.on_sample(2) {
            FilterOutcome::Rearm { token, delay } => {
                assert_eq!(delay, Duration::from_millis(10));
                token
            }
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(f.committed(), Some(1));
        assert_eq!(f.on_settle(token, 2), FilterOutcome::Commit(2));
        assert_eq!(f.committed(), Some(2));
    }

    #[test]
    fn test_settle_rearms_while_unstable() {
        let mut f = DebounceFilter::new(SETTLE);
        f.prime(0);
        let FilterOutcome::Rearm { token, .. } = f.on_sample(4) else {
            panic!("expected rearm");
        };
        let FilterOutcome::Rearm { token: next, .. } = f.on_settle(token, 5) else {
            panic!("expected rearm");
        };
        assert_ne!(token, next);
        // the first timer is now stale
        assert_eq!(f.on_settle(token, 5), FilterOutcome::Unchanged);
        assert_eq!(f.on_settle(next, 5), FilterOutcome::Commit(5));
    }

    #[test]
    fn test_settle_glitch_back_to_committed_is_dropped() {
        let mut f = DebounceFilter::new(SETTLE);
        f.prime(6);
        let FilterOutcome::Rearm { token, .. } = f.on_sample(7) else {
            panic!("expected rearm");
        };
        assert_eq!(f.on_sample(6), FilterOutcome::Unchanged);
        assert_eq!(f.on_settle(token, 7), FilterOutcome::Unchanged);
        assert_eq!(f.committed(), Some(6));
    }

    #[test]
    fn test_settle_repeated_pending_sample_keeps_timer() {
        let mut f = DebounceFilter::new(SETTLE);
        f.prime(0);
        let FilterOutcome::Rearm { token, .. } = f.on_sample(3) else {
            panic!("expected rearm");
        };
        assert_eq!(f.on_sample(3), FilterOutcome::Unchanged);
        assert_eq!(f.on_sample(3), FilterOutcome::Unchanged);
        assert_eq!(f.on_settle(token, 3), FilterOutcome::Commit(3));
    }

    #[test]
    fn test_force_cancels_pending() {
        let mut f = DebounceFilter::new(SETTLE);
        f.prime(0);
        let FilterOutcome::Rearm { token, .. } = f.on_sample(1) else {
            panic!("expected rearm");
        };
        f.force(0);
        assert_eq!(f.on_settle(token, 1), FilterOutcome::Unchanged);
        assert_eq!(f.committed(), Some(0));
    }
}
