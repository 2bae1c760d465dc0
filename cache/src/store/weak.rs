use super::EvictionStore;
use crate::listener::OnEvict;
use crate::record::{Record, WeakRecord};

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use ahash::{HashMap, HashMapExt};

enum Slot<V> {
  /// Pending and rejected records are held strongly; there is no value
  /// for anyone else to keep alive yet.
  Held(Record<V>),
  /// A resolved value that lives only as long as someone outside the
  /// store holds it, either directly or through its record.
  Weak {
    record: WeakRecord<V>,
    value: Weak<V>,
    generation: u64,
  },
}

/// A store that holds resolved values weakly.
///
/// Once a record has resolved, the store downgrades it the next time it sees
/// it (on `get` or `sweep`). From then on the entry survives only while some
/// caller still holds the `Arc<V>`. A collected entry is noticed lazily, on
/// the next `get` or `sweep`, and reported to the eviction listener at that
/// point.
pub struct WeakRefStore<K, V> {
  slots: HashMap<K, Slot<V>>,
  on_evict: OnEvict<K>,
}

impl<K, V> fmt::Debug for WeakRefStore<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WeakRefStore")
      .field("slots", &self.slots.len())
      .finish_non_exhaustive()
  }
}

impl<K, V> WeakRefStore<K, V> {
  pub fn new(on_evict: OnEvict<K>) -> Self {
    Self {
      slots: HashMap::new(),
      on_evict,
    }
  }
}

impl<V> Slot<V> {
  /// Hands out the slot's record, downgrading it if it has resolved.
  ///
  /// The record a caller still holds is returned as is, so refreshes stay
  /// visible to it. A record nobody holds is rebuilt around its surviving
  /// value. `None` once the value has been collected.
  fn revive(&mut self) -> Option<Record<V>> {
    let record = match self {
      Slot::Held(record) => record.clone(),
      Slot::Weak {
        record,
        value,
        generation,
      } => match record.upgrade() {
        Some(record) => record,
        None => Record::resolved_at(*generation, value.upgrade()?),
      },
    };
    *self = match record.value() {
      Some(value) => Slot::Weak {
        record: record.downgrade(),
        value: Arc::downgrade(&value),
        generation: record.generation(),
      },
      None => Slot::Held(record.clone()),
    };
    Some(record)
  }

  fn is_collected(&self) -> bool {
    matches!(self, Slot::Weak { value, .. } if value.strong_count() == 0)
  }
}

impl<K, V> EvictionStore<K, V> for WeakRefStore<K, V>
where
  K: Eq + Hash + Clone + Send,
  V: Send + Sync,
{
  fn get(&mut self, key: &K) -> Option<Record<V>> {
    let slot = self.slots.get_mut(key)?;
    match slot.revive() {
      Some(record) => Some(record),
      None => {
        self.slots.remove(key);
        self.on_evict.on_evict(key);
        None
      }
    }
  }

  fn set(&mut self, key: K, record: Record<V>) {
    self.slots.insert(key, Slot::Held(record));
  }

  fn delete(&mut self, key: &K) -> Option<Record<V>> {
    self.slots.remove(key)?.revive()
  }

  fn drain(&mut self) -> Vec<(K, Record<V>)> {
    self
      .slots
      .drain()
      .filter_map(|(key, mut slot)| slot.revive().map(|record| (key, record)))
      .collect()
  }

  fn sweep(&mut self) -> usize {
    for slot in self.slots.values_mut() {
      let _ = slot.revive();
    }

    let collected: Vec<K> = self
      .slots
      .iter()
      .filter(|(_, slot)| slot.is_collected())
      .map(|(key, _)| key.clone())
      .collect();
    for key in &collected {
      self.slots.remove(key);
      self.on_evict.on_evict(key);
    }
    collected.len()
  }

  fn len(&self) -> usize {
    self.slots.len()
  }
}
