//! Per-key mutexes.
//!
//! Writers that read and rewrite derived state for one key take that key's
//! lock; different keys proceed in parallel. Where both a prospect lock and a
//! pair lock are needed, the prospect lock is taken first.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

pub struct KeyedLocks<K> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// The mutex for `key`, created on first use.
    pub fn get(&self, key: &K) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(key.clone()).or_default().value())
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_shares_one_mutex() {
        let locks: KeyedLocks<String> = KeyedLocks::new();
        let a = locks.get(&"p1".to_string());
        let b = locks.get(&"p1".to_string());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &locks.get(&"p2".to_string())));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn held_lock_blocks_same_key_only() {
        let locks: KeyedLocks<String> = KeyedLocks::new();
        let held = locks.get(&"p1".to_string());
        let _guard = held.lock();
        assert!(locks.get(&"p1".to_string()).try_lock().is_none());
        assert!(locks.get(&"p2".to_string()).try_lock().is_some());
    }
}
