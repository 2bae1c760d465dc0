//! Pluggable key → record containers.
//!
//! The engine serializes every call behind one mutex, so stores take
//! `&mut self` and need no interior locking of their own.

pub mod lru;
pub mod map;
pub mod weak;

mod recency;

use crate::listener::OnEvict;
use crate::record::Record;

use std::sync::Arc;

pub use lru::LruStore;
pub use map::MapStore;
pub use weak::WeakRefStore;

/// A key → [`Record`] container with an eviction notification hook.
///
/// Implementations call their `OnEvict` listener whenever they drop an
/// entry by their own policy. `delete` and `drain` are caller-driven and
/// must not notify.
pub trait EvictionStore<K, V>: Send {
  /// Looks up a record. Stores may update recency or detect collected
  /// entries here.
  fn get(&mut self, key: &K) -> Option<Record<V>>;

  /// Inserts or replaces the record for `key`.
  fn set(&mut self, key: K, record: Record<V>);

  /// Removes and returns the record for `key`.
  fn delete(&mut self, key: &K) -> Option<Record<V>>;

  /// Removes every live entry without notifying.
  fn drain(&mut self) -> Vec<(K, Record<V>)>;

  /// Eagerly detects entries the store has lost track of and evicts them,
  /// returning how many were evicted.
  fn sweep(&mut self) -> usize {
    0
  }

  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Builds a store for a cache, given the cache's eviction callback.
pub type StoreFactory<K, V> = Arc<dyn Fn(OnEvict<K>) -> Box<dyn EvictionStore<K, V>> + Send + Sync>;
