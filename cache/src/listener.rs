use std::sync::Arc;

/// Receives the key of every entry a store removes on its own initiative
/// (capacity pressure, a collected weak value).
///
/// Explicit removals by the caller (`invalidate`, `abort`, `evict_all`)
/// never reach the listener. Any `Fn(&K)` closure is a listener.
pub trait EvictionListener<K>: Send + Sync {
  fn on_evict(&self, key: &K);
}

impl<K, F> EvictionListener<K> for F
where
  F: Fn(&K) + Send + Sync,
{
  fn on_evict(&self, key: &K) {
    self(key)
  }
}

/// The shared eviction callback handed to a store when it is created.
pub type OnEvict<K> = Arc<dyn EvictionListener<K>>;
