//! The persistence contract the engine consumes, plus two backends.
//!
//! A [`Store`] holds one [`Sequence`] record per name. The engine serializes
//! all access to a given name through its own lock table, so a backend only
//! has to make each individual call atomic: `write` replaces the whole record
//! or leaves the previous version untouched.
//!
//! - [`MemoryStore`] keeps records in a process-local map.
//! - [`FileStore`] keeps one JSON document per sequence in a directory.

mod file;
mod memory;

pub use file::*;
pub use memory::*;

use crate::{Sequence, SequenceConfig};
use std::sync::Arc;

/// Failures reported by a [`Store`] backend.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No record exists for this name.
    #[error("no record for `{0}`")]
    Missing(String),

    /// A record already exists for this name.
    #[error("record for `{0}` already exists")]
    Exists(String),

    /// Filesystem or device error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Any other backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Durable home of sequence records.
pub trait Store: Send + Sync {
    /// Creates the record for `name` positioned at `begin`.
    ///
    /// Fails with [`StoreError::Exists`] if one is already present; this call
    /// never overwrites.
    fn init_sequence(
        &self,
        name: &str,
        config: &SequenceConfig,
        begin: i64,
    ) -> Result<(), StoreError>;

    /// Loads the current record, or [`StoreError::Missing`].
    fn read(&self, name: &str) -> Result<Sequence, StoreError>;

    /// Replaces the record for an existing `name` in full.
    fn write(&self, name: &str, sequence: &Sequence) -> Result<(), StoreError>;

    /// Names of all stored sequences, in no particular order.
    fn names(&self) -> Result<Vec<String>, StoreError>;
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn init_sequence(
        &self,
        name: &str,
        config: &SequenceConfig,
        begin: i64,
    ) -> Result<(), StoreError> {
        (**self).init_sequence(name, config, begin)
    }

    fn read(&self, name: &str) -> Result<Sequence, StoreError> {
        (**self).read(name)
    }

    fn write(&self, name: &str, sequence: &Sequence) -> Result<(), StoreError> {
        (**self).write(name, sequence)
    }

    fn names(&self) -> Result<Vec<String>, StoreError> {
        (**self).names()
    }
}
