//! Error types for the allocation engine.
//!
//! Every failure an engine operation can report is a distinct [`Error`]
//! variant so callers (and the HTTP layer) can tell a caller mistake from
//! legitimate exhaustion from a transient condition worth retrying.

use crate::StoreError;
use core::time::Duration;

/// Result alias used throughout `ordinal`.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants the engine can emit.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No sequence record exists under this name.
    #[error("sequence `{name}` not found")]
    NotFound { name: String },

    /// The index is not an outstanding reservation (never issued under
    /// confirmation, already confirmed or released, or already expired).
    #[error("no outstanding reservation for index {index} in sequence `{name}`")]
    ReservationNotFound { name: String, index: i64 },

    /// Initialization is one-shot; the record already exists.
    #[error("sequence `{name}` already exists")]
    AlreadyExists { name: String },

    /// A policy name, bound, step or pad was rejected by the resolver.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// The sequence name cannot be used as a store key.
    #[error("invalid sequence name `{name}`: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The increment policy cannot produce another index within bounds.
    #[error("sequence `{name}` exhausted: no index after {last} within max {max_index}")]
    OutOfRange {
        name: String,
        last: i64,
        max_index: i64,
    },

    /// The store failed to read or persist the record.
    #[error("store failure: {0}")]
    StoreFailure(StoreError),

    /// The per-name critical section could not be entered in time.
    #[error("timed out after {waited:?} waiting for sequence `{name}`")]
    LockTimeout { name: String, waited: Duration },

    /// The caller went away before the record was written.
    #[error("operation on sequence `{name}` was cancelled before it was persisted")]
    Cancelled { name: String },
}

impl Error {
    /// Whether repeating the same call may succeed.
    ///
    /// No identifier is ever granted without a confirmed write, so these are
    /// always safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreFailure(_) | Self::LockTimeout { .. } | Self::Cancelled { .. }
        )
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::ReservationNotFound { .. } => "reservation_not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::InvalidName { .. } => "invalid_name",
            Self::OutOfRange { .. } => "out_of_range",
            Self::StoreFailure(_) => "store_failure",
            Self::LockTimeout { .. } => "lock_timeout",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing(name) => Self::NotFound { name },
            StoreError::Exists(name) => Self::AlreadyExists { name },
            other => Self::StoreFailure(other),
        }
    }
}
