use super::EvictionStore;
use crate::record::Record;

use std::hash::Hash;

use ahash::{HashMap, HashMapExt};

/// An unbounded store. It never evicts.
#[derive(Debug)]
pub struct MapStore<K, V> {
  map: HashMap<K, Record<V>>,
}

impl<K, V> Default for MapStore<K, V> {
  fn default() -> Self {
    Self { map: HashMap::new() }
  }
}

impl<K, V> MapStore<K, V> {
  pub fn new() -> Self {
    Self::default()
  }
}

impl<K, V> EvictionStore<K, V> for MapStore<K, V>
where
  K: Eq + Hash + Send,
  V: Send + Sync,
{
  fn get(&mut self, key: &K) -> Option<Record<V>> {
    self.map.get(key).cloned()
  }

  fn set(&mut self, key: K, record: Record<V>) {
    self.map.insert(key, record);
  }

  fn delete(&mut self, key: &K) -> Option<Record<V>> {
    self.map.remove(key)
  }

  fn drain(&mut self) -> Vec<(K, Record<V>)> {
    self.map.drain().collect()
  }

  fn len(&self) -> usize {
    self.map.len()
  }
}
