//! The allocation engine: policy-driven `next`, plus init, confirm, release,
//! reap and describe over a [`Store`].
//!
//! Every operation on a name runs inside that name's critical section, from
//! the first read through the final write, so read-modify-write cycles on
//! one sequence never interleave. The engine keeps no sequence state of its
//! own between calls; the store is the only source of truth.

mod lock;

use crate::{
    CancelSignal, Error, NeverCancel, PolicyDefaults, RandSource, ReapSummary, Result, Sequence,
    SequenceConfig, SequenceConfigPatch, Store, SystemClock, ThreadRandom, TimeSource,
    format_identifier, resolve, validate_name,
};
use core::time::Duration;
use lock::{LockTable, NameGuard};
use serde::Serialize;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Default bound on waiting for a sequence's critical section.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for a [`SequenceEngine`].
#[derive(Clone, Debug)]
pub struct EngineOptions {
    /// How long an operation waits for its sequence before failing with
    /// [`Error::LockTimeout`].
    pub lock_timeout: Duration,
    /// Values for fields a caller leaves out at init.
    pub defaults: PolicyDefaults,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            defaults: PolicyDefaults::default(),
        }
    }
}

/// One identifier granted by [`SequenceEngine::next`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    /// The formatted, externally visible identifier.
    pub identifier: String,
    /// The raw index behind it.
    pub index: i64,
    /// Drawn from the reclaim pool rather than computed from `last`.
    pub reissued: bool,
    /// Outstanding until confirmed, released, or expired.
    pub reserved: bool,
    /// Expired reservations reaped on the way in.
    #[serde(skip)]
    pub reaped: ReapSummary,
}

/// Totals from sweeping every stored sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sequences examined.
    pub scanned: usize,
    /// Sequences skipped because they were busy or vanished mid-sweep.
    pub skipped: usize,
    /// Reservations reaped across all sequences.
    pub reaped: ReapSummary,
}

/// Issues identifiers from named sequences held in a [`Store`].
///
/// `T` supplies reservation timestamps and `R` drives the `Random` reissue
/// policy; both default to the real system sources.
///
/// # Example
///
/// ```
/// use ordinal::{MemoryStore, SequenceConfigPatch, SequenceEngine};
///
/// let engine = SequenceEngine::new(MemoryStore::new());
/// let patch = SequenceConfigPatch {
///     index_pad: Some("00000".into()),
///     min_index: Some(1),
///     ..Default::default()
/// };
/// engine.init_sequence("INV-", &patch, None).unwrap();
///
/// assert_eq!(engine.next("INV-").unwrap().identifier, "INV-00001");
/// assert_eq!(engine.next("INV-").unwrap().identifier, "INV-00002");
/// ```
pub struct SequenceEngine<S, T = SystemClock, R = ThreadRandom>
where
    S: Store,
    T: TimeSource,
    R: RandSource,
{
    store: S,
    clock: T,
    rand: R,
    locks: LockTable,
    options: EngineOptions,
}

impl<S: Store> SequenceEngine<S> {
    /// Creates an engine over `store` with default options.
    pub fn new(store: S) -> Self {
        Self::with_options(store, EngineOptions::default())
    }

    /// Creates an engine over `store` with explicit options.
    pub fn with_options(store: S, options: EngineOptions) -> Self {
        Self::from_components(store, SystemClock, ThreadRandom, options)
    }
}

impl<S, T, R> SequenceEngine<S, T, R>
where
    S: Store,
    T: TimeSource,
    R: RandSource,
{
    /// Creates an engine from explicit time and randomness sources.
    ///
    /// Primarily useful for tests that need to control expiry or the
    /// `Random` reissue policy.
    pub fn from_components(store: S, clock: T, rand: R, options: EngineOptions) -> Self {
        Self {
            store,
            clock,
            rand,
            locks: LockTable::default(),
            options,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Resolves `patch` against the configured defaults and creates the
    /// sequence positioned at `begin` (or at `minIndex` when omitted).
    ///
    /// Initialization is one-shot: an existing record is never overwritten.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidName`], [`Error::InvalidConfig`] (bad policy, bounds,
    /// or `begin` outside them), [`Error::AlreadyExists`],
    /// [`Error::LockTimeout`], [`Error::StoreFailure`].
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, patch), err))]
    pub fn init_sequence(
        &self,
        name: &str,
        patch: &SequenceConfigPatch,
        begin: Option<i64>,
    ) -> Result<SequenceConfig> {
        validate_name(name)?;
        let config = resolve(patch, &self.options.defaults)?;
        let begin = begin.unwrap_or(config.min_index);
        config.check_begin(begin)?;

        let _guard = self.lock(name)?;
        self.store.init_sequence(name, &config, begin)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            begin,
            increment = %config.increment_policy,
            reissue = %config.reissue_policy,
            "sequence initialized"
        );
        Ok(config)
    }

    /// Issues the next identifier for `name`.
    ///
    /// Equivalent to [`Self::next_with`] with a signal that never fires.
    pub fn next(&self, name: &str) -> Result<Allocation> {
        self.next_with(name, &NeverCancel)
    }

    /// Issues the next identifier for `name`, aborting without a write if
    /// `cancel` fires before the record is persisted.
    ///
    /// Expired reservations are reaped first. With `reclaimKeys` and a
    /// non-empty pool, the index comes from the pool per `reissuePolicy` and
    /// `last` is left alone; otherwise it is computed from `last` per
    /// `incrementPolicy`. Under `requireConfirm` the index is recorded as a
    /// reservation. The identifier is only returned once the updated record
    /// has been written.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`], [`Error::OutOfRange`], [`Error::StoreFailure`],
    /// [`Error::LockTimeout`], [`Error::Cancelled`], [`Error::InvalidName`].
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, cancel), err))]
    pub fn next_with<C>(&self, name: &str, cancel: &C) -> Result<Allocation>
    where
        C: CancelSignal + ?Sized,
    {
        validate_name(name)?;
        let _guard = self.lock(name)?;
        self.check_cancelled(name, cancel)?;

        let mut sequence = self.store.read(name)?;
        let now = self.clock.current_millis();
        let reaped = sequence.reap(now);

        let (index, reissued) = match sequence.take_reclaimed(&self.rand) {
            Some(index) => (index, true),
            None => {
                let last = sequence.last;
                let index = sequence.advance().ok_or_else(|| Error::OutOfRange {
                    name: name.to_string(),
                    last,
                    max_index: sequence.config.max_index,
                })?;
                (index, false)
            }
        };

        let reserved = sequence.config.require_confirm;
        if reserved {
            sequence.reserve(index, now);
        }

        self.check_cancelled(name, cancel)?;
        self.store.write(name, &sequence)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            index,
            reissued,
            reserved,
            expired = reaped.expired,
            "identifier issued"
        );

        Ok(Allocation {
            identifier: format_identifier(name, index, &sequence.config.index_pad),
            index,
            reissued,
            reserved,
            reaped,
        })
    }

    /// Permanently consumes an outstanding reservation.
    ///
    /// Expired reservations are reaped first, so a late confirmation fails.
    /// Returns what that reap removed.
    ///
    /// # Errors
    ///
    /// [`Error::ReservationNotFound`] if `index` is not outstanding, plus the
    /// lookup, lock and store errors of [`Self::next`].
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub fn confirm(&self, name: &str, index: i64) -> Result<ReapSummary> {
        self.settle(name, index, Sequence::confirm)
    }

    /// Hands an outstanding reservation back: into the reclaim pool under
    /// `reclaimKeys`, otherwise discarded.
    ///
    /// # Errors
    ///
    /// Same as [`Self::confirm`].
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub fn release(&self, name: &str, index: i64) -> Result<ReapSummary> {
        self.settle(name, index, Sequence::release)
    }

    /// Reaps expired reservations of one sequence, writing back only if
    /// anything expired.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub fn reap(&self, name: &str) -> Result<ReapSummary> {
        validate_name(name)?;
        let _guard = self.lock(name)?;

        let mut sequence = self.store.read(name)?;
        let summary = sequence.reap(self.clock.current_millis());
        if !summary.is_empty() {
            self.store.write(name, &sequence)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(
                expired = summary.expired,
                reclaimed = summary.reclaimed,
                "reservations reaped"
            );
        }
        Ok(summary)
    }

    /// Reaps every stored sequence.
    ///
    /// Sequences that are busy past the lock timeout, or that disappear
    /// between listing and reading, are counted as skipped. Any other failure
    /// aborts the sweep.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), err))]
    pub fn reap_all(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        for name in self.store.names()? {
            report.scanned += 1;
            match self.reap(&name) {
                Ok(summary) => report.reaped += summary,
                Err(Error::LockTimeout { .. } | Error::NotFound { .. }) => {
                    report.skipped += 1;

                    #[cfg(feature = "tracing")]
                    tracing::warn!(name = %name, "sequence skipped during sweep");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    /// Snapshot of the persisted record. Does not reap.
    pub fn describe(&self, name: &str) -> Result<Sequence> {
        validate_name(name)?;
        let _guard = self.lock(name)?;
        Ok(self.store.read(name)?)
    }

    fn settle(
        &self,
        name: &str,
        index: i64,
        apply: fn(&mut Sequence, i64) -> bool,
    ) -> Result<ReapSummary> {
        validate_name(name)?;
        let _guard = self.lock(name)?;

        let mut sequence = self.store.read(name)?;
        let reaped = sequence.reap(self.clock.current_millis());
        if !apply(&mut sequence, index) {
            if !reaped.is_empty() {
                self.store.write(name, &sequence)?;
            }
            return Err(Error::ReservationNotFound {
                name: name.to_string(),
                index,
            });
        }
        self.store.write(name, &sequence)?;
        Ok(reaped)
    }

    fn lock(&self, name: &str) -> Result<NameGuard<'_>> {
        let waited = self.options.lock_timeout;
        self.locks.acquire(name, waited).ok_or_else(|| {
            #[cfg(feature = "tracing")]
            tracing::warn!(name, ?waited, "lock acquisition timed out");

            Error::LockTimeout {
                name: name.to_string(),
                waited,
            }
        })
    }

    fn check_cancelled<C>(&self, name: &str, cancel: &C) -> Result<()>
    where
        C: CancelSignal + ?Sized,
    {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}
