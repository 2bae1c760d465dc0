//! An in-process cache for asynchronously loaded, keyed values, built to
//! sit under rendering code that suspends until data is ready.
//!
//! # Features
//! - **Load deduplication**: at most one load per key is in flight; every
//!   caller shares its [`Wakeable`] future.
//! - **Suspend or await**: [`Cache::get`] never blocks and returns a
//!   [`Suspend`]; the same future can be awaited, blocked on, or given
//!   callbacks.
//! - **Pluggable stores**: weakly held values (the default), LRU with a
//!   capacity, an unbounded map, or any [`EvictionStore`].
//! - **Refresh and abort**: records move back to pending without leaving
//!   the store; loads receive an [`AbortSignal`].
//! - **Range caches**: [`RangeCache`] and [`IntervalCache`] load only the
//!   gaps of a query and keep loaded spans coalesced.

// Internal, crate-only modules
mod logging;
mod loader;
mod shared;
mod subscription;

// Public modules that form the API
pub mod abort;
pub mod builder;
pub mod error;
pub mod handles;
pub mod listener;
pub mod metrics;
pub mod range;
pub mod record;
pub mod runtime;
pub mod store;
pub mod wakeable;

// Re-export the primary user-facing types for convenience
pub use abort::{AbortController, AbortSignal};
pub use builder::CacheBuilder;
pub use error::{BuildError, CacheError};
pub use handles::external::ExternallyManagedCache;
pub use handles::single::SingleEntryCache;
pub use handles::Cache;
pub use listener::{EvictionListener, OnEvict};
pub use logging::{disable_debug_logging, enable_debug_logging, is_debug_logging_enabled};
pub use metrics::MetricsSnapshot;
pub use range::{IntervalCache, RangeCache, RangeCacheBuilder, RangeValues, Span, SpanIndex};
pub use record::{Record, RecordStatus};
pub use runtime::TaskSpawner;
pub use store::{EvictionStore, LruStore, MapStore, StoreFactory, WeakRefStore};
pub use subscription::Subscription;
pub use wakeable::{Deferred, Suspend, Wakeable};

#[cfg(feature = "tokio")]
pub use runtime::TokioSpawner;
