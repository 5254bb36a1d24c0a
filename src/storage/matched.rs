use crate::storage::row::Serial;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

/// Serials currently satisfying the active filter, behind their own lock.
///
/// The set is only ever swapped wholesale, so readers see either the previous
/// or the next complete result.
#[derive(Debug, Default)]
pub struct MatchedSet {
    serials: RwLock<HashSet<Serial>>,
}

impl MatchedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, serials: HashSet<Serial>) {
        *self.serials.write().unwrap_or_else(PoisonError::into_inner) = serials;
    }

    pub fn clear(&self) {
        self.replace(HashSet::new());
    }

    pub fn remove_all(&self, evicted: &[Serial]) {
        if evicted.is_empty() {
            return;
        }
        let mut serials = self.serials.write().unwrap_or_else(PoisonError::into_inner);
        for serial in evicted {
            serials.remove(serial);
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, HashSet<Serial>> {
        self.serials.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of matching serials
    pub fn count(&self) -> usize {
        self.read().len()
    }
}
