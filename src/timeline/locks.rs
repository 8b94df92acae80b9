//! Per-session write locks

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Lock table keyed by session id
///
/// Writers of one session are serialized; writers of different sessions
/// never wait on each other here. Entries nobody holds are pruned whenever a
/// new session is added, so the table only tracks sessions in use.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock for `session_id`
    ///
    /// The caller locks the returned mutex for as long as it needs the
    /// session to stay still.
    pub fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(session_id) {
            return lock.clone();
        }

        // Only the table holds these, so no caller is locked on or waiting for them
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);

        let lock = Arc::new(Mutex::new(()));
        locks.insert(session_id.to_string(), lock.clone());
        lock
    }

    /// Number of sessions currently tracked
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_session_shares_a_lock() {
        let locks = SessionLocks::new();
        let a = locks.lock_for("s-1");
        let b = locks.lock_for("s-1");
        let c = locks.lock_for("s-2");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn test_idle_locks_are_pruned() {
        let locks = SessionLocks::new();
        for i in 0..500 {
            let lock = locks.lock_for(&format!("s-{}", i));
            let _guard = lock.lock();
        }
        let held = locks.lock_for("busy");

        assert_eq!(locks.len(), 1);

        // A held lock survives pruning and is handed out again
        locks.lock_for("other");
        assert_eq!(locks.len(), 2);
        assert!(Arc::ptr_eq(&held, &locks.lock_for("busy")));
    }

    #[test]
    fn test_other_session_not_blocked() {
        let locks = SessionLocks::new();
        let first = locks.lock_for("s-1");
        let _held = first.lock();

        assert!(locks.lock_for("s-1").try_lock().is_none());
        assert!(locks.lock_for("s-2").try_lock().is_some());
    }
}
