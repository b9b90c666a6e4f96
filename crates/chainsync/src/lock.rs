//! Per-dataset mutual exclusion for synchronization sessions and
//! contributor-list mutations.
//!
//! `try_acquire` never blocks: a second caller gets `None` (surfaced as
//! `SessionBusy`) and retries later instead of queuing unboundedly.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

#[derive(Clone, Default)]
pub struct SessionLock {
    active: Arc<Mutex<HashSet<Uuid>>>,
}

impl SessionLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, dataset_id: Uuid) -> Option<SessionGuard> {
        let mut active = self.active.lock().unwrap();
        if !active.insert(dataset_id) {
            return None;
        }
        Some(SessionGuard {
            active: self.active.clone(),
            dataset_id,
        })
    }
}

/// Releases the dataset's slot on drop, including on panic or early return.
pub struct SessionGuard {
    active: Arc<Mutex<HashSet<Uuid>>>,
    dataset_id: Uuid,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active.lock().unwrap().remove(&self.dataset_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_released() {
        let lock = SessionLock::new();
        let id = Uuid::new_v4();

        let guard = lock.try_acquire(id).unwrap();
        assert!(lock.try_acquire(id).is_none());

        drop(guard);
        assert!(lock.try_acquire(id).is_some());
    }

    #[test]
    fn different_datasets_do_not_contend() {
        let lock = SessionLock::new();
        let _a = lock.try_acquire(Uuid::new_v4()).unwrap();
        let _b = lock.try_acquire(Uuid::new_v4()).unwrap();
    }
}
