use super::recency::RecencyMap;
use super::EvictionStore;
use crate::listener::OnEvict;
use crate::record::Record;

use std::fmt;
use std::hash::Hash;

/// A capacity-bounded store that evicts the least recently used entry.
///
/// Both `get` and `set` count as a use. Inserting a new key into a full
/// store evicts exactly one entry and reports it to the listener.
///
/// Pending records are never chosen as victims, so a load in flight keeps
/// its key. While every other entry is pending the store may run over
/// capacity; the excess is trimmed on a later insert.
pub struct LruStore<K, V> {
  capacity: usize,
  entries: RecencyMap<K, Record<V>>,
  on_evict: OnEvict<K>,
}

impl<K, V> fmt::Debug for LruStore<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LruStore")
      .field("capacity", &self.capacity)
      .finish_non_exhaustive()
  }
}

impl<K: Eq + Hash + Clone, V> LruStore<K, V> {
  /// Creates a store holding at most `capacity` entries (at least one).
  pub fn new(capacity: usize, on_evict: OnEvict<K>) -> Self {
    Self {
      capacity: capacity.max(1),
      entries: RecencyMap::new(),
      on_evict,
    }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }
}

impl<K, V> EvictionStore<K, V> for LruStore<K, V>
where
  K: Eq + Hash + Clone + Send,
  V: Send + Sync,
{
  fn get(&mut self, key: &K) -> Option<Record<V>> {
    self.entries.touch(key).cloned()
  }

  fn set(&mut self, key: K, record: Record<V>) {
    if self.entries.insert(key.clone(), record).is_some() {
      return;
    }
    while self.entries.len() > self.capacity {
      match self.entries.pop_back_where(|candidate, record| *candidate != key && !record.is_pending()) {
        Some((victim, _)) => self.on_evict.on_evict(&victim),
        None => break,
      }
    }
  }

  fn delete(&mut self, key: &K) -> Option<Record<V>> {
    self.entries.remove(key)
  }

  fn drain(&mut self) -> Vec<(K, Record<V>)> {
    self.entries.drain()
  }

  fn len(&self) -> usize {
    self.entries.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use parking_lot::Mutex;
  use std::sync::Arc;

  fn recording_store(capacity: usize) -> (LruStore<u32, u32>, Arc<Mutex<Vec<u32>>>) {
    let evicted = Arc::new(Mutex::new(Vec::new()));
    let sink = evicted.clone();
    let store = LruStore::new(capacity, Arc::new(move |key: &u32| sink.lock().push(*key)));
    (store, evicted)
  }

  #[test]
  fn evicts_least_recently_used_once() {
    let (mut store, evicted) = recording_store(2);
    store.set(1, Record::resolved(Arc::new(10)));
    store.set(2, Record::resolved(Arc::new(20)));
    assert!(store.get(&1).is_some());

    store.set(3, Record::resolved(Arc::new(30)));

    assert_eq!(*evicted.lock(), vec![2]);
    assert!(store.get(&2).is_none());
    assert!(store.get(&1).is_some());
    assert_eq!(store.len(), 2);
  }

  #[test]
  fn delete_does_not_notify() {
    let (mut store, evicted) = recording_store(1);
    store.set(1, Record::resolved(Arc::new(10)));
    assert!(store.delete(&1).is_some());
    store.set(2, Record::resolved(Arc::new(20)));

    assert!(evicted.lock().is_empty());
  }

  #[test]
  fn pending_records_are_skipped_as_victims() {
    let (mut store, evicted) = recording_store(2);
    store.set(1, Record::pending());
    store.set(2, Record::resolved(Arc::new(20)));

    store.set(3, Record::resolved(Arc::new(30)));

    assert_eq!(*evicted.lock(), vec![2]);
    assert!(store.get(&1).unwrap().is_pending());
  }

  #[test]
  fn runs_over_capacity_while_everything_is_pending() {
    let (mut store, evicted) = recording_store(1);
    let first = Record::pending();
    store.set(1, first.clone());
    store.set(2, Record::pending());

    assert!(evicted.lock().is_empty());
    assert_eq!(store.len(), 2);

    first.resolve(Arc::new(10)).unwrap();
    store.set(3, Record::resolved(Arc::new(30)));
    assert_eq!(*evicted.lock(), vec![1]);
  }

  #[test]
  fn replacing_a_key_never_evicts() {
    let (mut store, evicted) = recording_store(1);
    store.set(1, Record::resolved(Arc::new(10)));
    store.set(1, Record::resolved(Arc::new(11)));

    assert!(evicted.lock().is_empty());
    assert_eq!(*store.get(&1).unwrap().value().unwrap(), 11);
  }
}
