use core::time::Duration;
use parking_lot::{Mutex, RawMutex, lock_api::ArcMutexGuard};
use std::{collections::HashMap, sync::Arc};

type Slot = Arc<Mutex<()>>;

/// One mutex per sequence name, created on first use and dropped once nobody
/// holds or waits on it.
///
/// The outer map lock is held only long enough to look up, insert or evict a
/// slot; waiting happens on the per-name mutex, so distinct names never
/// contend.
#[derive(Debug, Default)]
pub(crate) struct LockTable {
    slots: Mutex<HashMap<String, Slot>>,
}

/// Exclusive hold on one sequence name. Released on drop, evicting the slot
/// if no other caller has cloned it.
pub(crate) struct NameGuard<'a> {
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
    table: &'a LockTable,
    name: String,
}

impl Drop for NameGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.table.evict_idle(&self.name);
    }
}

impl LockTable {
    /// Enters the critical section for `name`, waiting at most `timeout`.
    pub(crate) fn acquire(&self, name: &str, timeout: Duration) -> Option<NameGuard<'_>> {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(
                slots
                    .entry(name.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };

        match slot.try_lock_arc_for(timeout) {
            Some(guard) => {
                drop(slot);
                Some(NameGuard {
                    guard: Some(guard),
                    table: self,
                    name: name.to_string(),
                })
            }
            None => {
                drop(slot);
                self.evict_idle(name);
                None
            }
        }
    }

    /// Removes the slot for `name` when the map holds the only reference.
    ///
    /// Callers clone a slot only under the map lock, so a count of one here
    /// means nobody holds it and nobody is queued on it.
    fn evict_idle(&self, name: &str) {
        let mut slots = self.slots.lock();
        let idle = slots
            .get(name)
            .is_some_and(|slot| Arc::strong_count(slot) == 1);
        if idle {
            slots.remove(name);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }
}
