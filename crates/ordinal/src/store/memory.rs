use crate::{Sequence, SequenceConfig, Store, StoreError};
use parking_lot::RwLock;
use std::collections::{HashMap, hash_map::Entry};

/// A [`Store`] backed by a process-local map.
///
/// Nothing survives a restart. Suitable for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Sequence>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn init_sequence(
        &self,
        name: &str,
        config: &SequenceConfig,
        begin: i64,
    ) -> Result<(), StoreError> {
        match self.records.write().entry(name.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Exists(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Sequence::new(config.clone(), begin));
                Ok(())
            }
        }
    }

    fn read(&self, name: &str) -> Result<Sequence, StoreError> {
        self.records
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::Missing(name.to_string()))
    }

    fn write(&self, name: &str, sequence: &Sequence) -> Result<(), StoreError> {
        match self.records.write().get_mut(name) {
            Some(record) => {
                *record = sequence.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(name.to_string())),
        }
    }

    fn names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.records.read().keys().cloned().collect())
    }
}
