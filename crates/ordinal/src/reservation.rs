//! Reservation bookkeeping on a loaded [`Sequence`]: expiry (reap),
//! confirmation, explicit release, and reissue from the reclaim pool.
//!
//! Everything here mutates the in-memory record only. Persisting the result
//! is the engine's job.

use crate::{RandSource, Reservation, Sequence};

/// What a reap pass did to one sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReapSummary {
    /// Reservations removed because their deadline passed.
    pub expired: usize,
    /// Of those, how many went back to the reclaim pool.
    pub reclaimed: usize,
}

impl ReapSummary {
    pub const fn is_empty(&self) -> bool {
        self.expired == 0
    }
}

impl core::ops::AddAssign for ReapSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.expired += rhs.expired;
        self.reclaimed += rhs.reclaimed;
    }
}

impl Sequence {
    /// Whether the reservation has outlived `confirmDeadline` at `now`.
    pub fn is_expired(&self, reservation: &Reservation, now: u64) -> bool {
        let deadline = self.config.confirm_deadline.as_millis();
        self.config.require_confirm
            && u128::from(now.saturating_sub(reservation.issued_at)) > deadline
    }

    /// Removes every expired reservation.
    ///
    /// With `reclaimKeys` each expired index is appended to the tail of the
    /// pool, in reservation order. Without it the index is dropped for good,
    /// leaving a permanent gap.
    pub fn reap(&mut self, now: u64) -> ReapSummary {
        let mut summary = ReapSummary::default();
        if !self.config.require_confirm || self.reserved.is_empty() {
            return summary;
        }

        let (expired, kept): (Vec<Reservation>, Vec<Reservation>) = self
            .reserved
            .iter()
            .copied()
            .partition(|reservation| self.is_expired(reservation, now));
        if expired.is_empty() {
            return summary;
        }

        self.reserved = kept;
        summary.expired = expired.len();
        if self.config.reclaim_keys {
            for reservation in expired {
                self.push_reclaimed(reservation.index);
                summary.reclaimed += 1;
            }
        }
        summary
    }

    /// Pops one index from the pool per `reissuePolicy`.
    ///
    /// Always `None` unless `reclaimKeys` is set.
    pub fn take_reclaimed(&mut self, rand: &dyn RandSource) -> Option<i64> {
        if !self.config.reclaim_keys {
            return None;
        }
        self.config.reissue_policy.take(&mut self.reclaimed, rand)
    }

    /// Records `index` as issued at `now`, pending confirmation.
    pub fn reserve(&mut self, index: i64, now: u64) {
        debug_assert!(self.position_of(index).is_none());
        self.reserved.push(Reservation {
            index,
            issued_at: now,
        });
    }

    /// Consumes the reservation permanently. `false` if it is not outstanding.
    pub fn confirm(&mut self, index: i64) -> bool {
        match self.position_of(index) {
            Some(pos) => {
                self.reserved.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Hands the reservation back: to the pool under `reclaimKeys`, otherwise
    /// discarded. `false` if it is not outstanding.
    pub fn release(&mut self, index: i64) -> bool {
        let Some(pos) = self.position_of(index) else {
            return false;
        };
        self.reserved.remove(pos);
        if self.config.reclaim_keys {
            self.push_reclaimed(index);
        }
        true
    }

    fn position_of(&self, index: i64) -> Option<usize> {
        self.reserved.iter().position(|r| r.index == index)
    }

    fn push_reclaimed(&mut self, index: i64) {
        debug_assert!(!self.reclaimed.contains(&index));
        self.reclaimed.push_back(index);
    }
}
