use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Ids of items with a move in flight.
///
/// The lock is only held for set operations, never across an await.
#[derive(Debug)]
pub struct MoveGuard<K> {
    in_flight: Mutex<HashSet<K>>,
}

impl<K> Default for MoveGuard<K> {
    fn default() -> Self {
        Self {
            in_flight: Mutex::new(HashSet::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> MoveGuard<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as moving. `None` if it already is.
    ///
    /// The id is released when the returned entry is dropped.
    pub fn try_acquire(&self, id: K) -> Option<GuardEntry<'_, K>> {
        if !self.lock().insert(id.clone()) {
            return None;
        }
        Some(GuardEntry { guard: self, id })
    }

    pub fn is_moving(&self, id: &K) -> bool {
        self.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<K>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct GuardEntry<'a, K: Eq + Hash + Clone> {
    guard: &'a MoveGuard<K>,
    id: K,
}

impl<K: Eq + Hash + Clone> GuardEntry<'_, K> {
    pub fn id(&self) -> &K {
        &self.id
    }
}

impl<K: Eq + Hash + Clone> Drop for GuardEntry<'_, K> {
    fn drop(&mut self) {
        self.guard.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_refused_until_release() {
        let guard = MoveGuard::new();
        let entry = guard.try_acquire("a").unwrap();
        assert!(guard.is_moving(&"a"));
        assert!(guard.try_acquire("a").is_none());

        drop(entry);
        assert!(!guard.is_moving(&"a"));
        assert!(guard.try_acquire("a").is_some());
    }

    #[test]
    fn distinct_ids_are_independent() {
        let guard = MoveGuard::new();
        let a = guard.try_acquire(1).unwrap();
        let b = guard.try_acquire(2).unwrap();
        assert_eq!(guard.len(), 2);
        assert_eq!(*a.id(), 1);
        drop(b);
        assert_eq!(guard.len(), 1);
        drop(a);
        assert!(guard.is_empty());
    }

    #[test]
    fn refused_acquire_does_not_release_the_holder() {
        let guard = MoveGuard::new();
        let _held = guard.try_acquire(5).unwrap();
        assert!(guard.try_acquire(5).is_none());
        assert!(guard.is_moving(&5));
    }
}
