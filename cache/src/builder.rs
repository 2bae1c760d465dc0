use crate::abort::AbortSignal;
use crate::error::BuildError;
use crate::handles::external::ExternallyManagedCache;
use crate::handles::single::SingleEntryCache;
use crate::handles::Cache;
use crate::listener::OnEvict;
use crate::loader::Loader;
use crate::logging::DebugLogging;
use crate::metrics::Metrics;
use crate::runtime::resolve_spawner;
use crate::shared::{CacheShared, KeyFn};
use crate::store::{EvictionStore, LruStore, MapStore, StoreFactory, WeakRefStore};
use crate::subscription::Subscribers;
use crate::TaskSpawner;

use core::fmt;
use std::error::Error as StdError;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

/// A builder for [`Cache`], [`SingleEntryCache`] and
/// [`ExternallyManagedCache`].
///
/// `P` is the request parameter type, `K` the key it projects to and `V`
/// the loaded value.
pub struct CacheBuilder<P, K, V> {
  loader: Option<Loader<P, V>>,
  key_fn: KeyFn<P, K>,
  name: Option<String>,
  use_weak_ref: bool,
  immutable: bool,
  debug_logging: Option<bool>,
  capacity: Option<usize>,
  store_factory: Option<StoreFactory<K, V>>,
  spawner: Option<Arc<dyn TaskSpawner>>,
}

// Manual Debug implementation for CacheBuilder.
impl<P, K, V> fmt::Debug for CacheBuilder<P, K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheBuilder")
      .field("name", &self.name)
      .field("use_weak_ref", &self.use_weak_ref)
      .field("immutable", &self.immutable)
      .field("debug_logging", &self.debug_logging)
      .field("capacity", &self.capacity)
      .field("has_loader", &self.loader.is_some())
      .field("has_store_factory", &self.store_factory.is_some())
      .finish_non_exhaustive()
  }
}

// --- Constructors ---
// Parameters double as keys until `key` installs a projection.
impl<P, V> CacheBuilder<P, P, V>
where
  P: Clone + Send + 'static,
  V: Send + Sync + 'static,
{
  fn with_loader(loader: Option<Loader<P, V>>) -> Self {
    Self {
      loader,
      key_fn: Arc::new(|params: &P| params.clone()),
      name: None,
      use_weak_ref: true,
      immutable: false,
      debug_logging: None,
      capacity: None,
      store_factory: None,
      spawner: None,
    }
  }

  /// Creates a builder around an asynchronous loader.
  ///
  /// The loader receives the request parameters and the abort signal of the
  /// load it is running; it runs on the configured [`TaskSpawner`], or on
  /// the ambient Tokio runtime.
  pub fn new<F, Fut, E>(loader: F) -> Self
  where
    F: Fn(P, AbortSignal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    E: Into<Box<dyn StdError + Send + Sync>>,
  {
    Self::with_loader(Some(Loader::from_async(loader)))
  }

  /// Creates a builder around a blocking loader, run on its own thread.
  pub fn with_sync_loader<F, E>(loader: F) -> Self
  where
    F: Fn(P, AbortSignal) -> Result<V, E> + Send + Sync + 'static,
    E: Into<Box<dyn StdError + Send + Sync>>,
  {
    Self::with_loader(Some(Loader::from_sync(loader)))
  }

  /// Creates a builder for a cache without a loader, whose values are all
  /// supplied by the caller. Resolved values are held strongly by default.
  pub fn externally_managed() -> Self {
    Self::with_loader(None).use_weak_ref(false)
  }
}

// --- General Configuration Methods ---
impl<P, K, V> CacheBuilder<P, K, V> {
  /// Sets how request parameters project to cache keys.
  ///
  /// Distinct requests must project to distinct keys; collisions are not
  /// detected. Any store set through [`store`](Self::store) is keyed by the
  /// old key type and is discarded, so call this first.
  pub fn key<K2, F>(self, key_fn: F) -> CacheBuilder<P, K2, V>
  where
    F: Fn(&P) -> K2 + Send + Sync + 'static,
  {
    CacheBuilder {
      loader: self.loader,
      key_fn: Arc::new(key_fn),
      name: self.name,
      use_weak_ref: self.use_weak_ref,
      immutable: self.immutable,
      debug_logging: self.debug_logging,
      capacity: self.capacity,
      store_factory: None,
      spawner: self.spawner,
    }
  }

  /// Names the cache in log events.
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Holds resolved values weakly (the default). Ignored when a capacity
  /// or a custom store is configured.
  pub fn use_weak_ref(mut self, enabled: bool) -> Self {
    self.use_weak_ref = enabled;
    self
  }

  /// Marks values as never changing once loaded, which disables `refresh`.
  pub fn immutable(mut self, immutable: bool) -> Self {
    self.immutable = immutable;
    self
  }

  /// Overrides the process-wide debug-logging switch for this cache.
  pub fn debug_logging(mut self, enabled: bool) -> Self {
    self.debug_logging = Some(enabled);
    self
  }

  /// Bounds the cache to `capacity` records with least-recently-used
  /// eviction.
  pub fn capacity(mut self, capacity: usize) -> Self {
    self.capacity = Some(capacity);
    self
  }

  /// Supplies the store. The factory receives the cache's eviction
  /// callback, which the store must invoke for every entry it drops on its
  /// own.
  pub fn store<F>(mut self, factory: F) -> Self
  where
    F: Fn(OnEvict<K>) -> Box<dyn EvictionStore<K, V>> + Send + Sync + 'static,
  {
    self.store_factory = Some(Arc::new(factory));
    self
  }

  pub fn spawner(mut self, spawner: Arc<dyn TaskSpawner>) -> Self {
    self.spawner = Some(spawner);
    self
  }
}

// --- Build Methods ---
impl<P, K, V> CacheBuilder<P, K, V>
where
  P: Clone + Send + 'static,
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Builds a [`Cache`].
  pub fn build(self) -> Result<Cache<P, K, V>, BuildError> {
    self.validate()?;
    let shared = self.build_shared_core()?;
    Ok(Cache { shared })
  }

  /// Builds an [`ExternallyManagedCache`]. Any loader is ignored.
  pub fn build_externally_managed(mut self) -> Result<ExternallyManagedCache<P, K, V>, BuildError> {
    self.loader = None;
    Ok(ExternallyManagedCache::from_cache(self.build()?))
  }

  /// Central logic to construct the shared core of the cache.
  fn build_shared_core(self) -> Result<Arc<CacheShared<P, K, V>>, BuildError> {
    let spawner = match &self.loader {
      Some(loader) if loader.is_async() => {
        Some(resolve_spawner(self.spawner).ok_or(BuildError::SpawnerRequired)?)
      }
      _ => self.spawner,
    };

    let debug = DebugLogging::new(self.debug_logging);
    let metrics = Arc::new(Metrics::new());
    let evicted: Arc<Mutex<Vec<K>>> = Arc::new(Mutex::new(Vec::new()));
    let name = self.name.unwrap_or_else(|| "cache".to_string());

    let on_evict: OnEvict<K> = {
      let metrics = metrics.clone();
      let evicted = evicted.clone();
      let name = name.clone();
      Arc::new(move |key: &K| {
        Metrics::bump(&metrics.evictions);
        evicted.lock().push(key.clone());
        crate::logging::debug_log!(debug, cache = %name, "store evicted an entry");
      })
    };

    let factory: StoreFactory<K, V> = match (self.store_factory, self.capacity) {
      (Some(factory), _) => factory,
      (None, Some(capacity)) => Arc::new(move |on_evict: OnEvict<K>| {
        Box::new(LruStore::<K, V>::new(capacity, on_evict)) as Box<dyn EvictionStore<K, V>>
      }),
      (None, None) if self.use_weak_ref => Arc::new(|on_evict: OnEvict<K>| {
        Box::new(WeakRefStore::<K, V>::new(on_evict)) as Box<dyn EvictionStore<K, V>>
      }),
      (None, None) => Arc::new(|_: OnEvict<K>| Box::new(MapStore::<K, V>::new()) as Box<dyn EvictionStore<K, V>>),
    };

    Ok(Arc::new(CacheShared {
      name,
      store: Mutex::new(factory(on_evict)),
      evicted,
      key_fn: self.key_fn,
      loader: self.loader,
      spawner,
      subscribers: Subscribers::new(),
      metrics,
      immutable: self.immutable,
      debug,
    }))
  }

  /// Validates the builder configuration.
  fn validate(&self) -> Result<(), BuildError> {
    if self.capacity == Some(0) {
      return Err(BuildError::ZeroCapacity);
    }
    Ok(())
  }
}

impl<V> CacheBuilder<(), (), V>
where
  V: Send + Sync + 'static,
{
  /// Builds a [`SingleEntryCache`].
  pub fn build_single_entry(self) -> Result<SingleEntryCache<V>, BuildError> {
    Ok(SingleEntryCache::from_cache(self.build()?))
  }
}
