use std::{future::Future, pin::Pin};

/// Runs loader futures. The cache never polls a loader itself; it hands the
/// load to a spawner and observes the outcome through the record.
pub trait TaskSpawner: Send + Sync + 'static {
  /// Spawns a type-erased future.
  fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>);
}

#[cfg(feature = "tokio")]
pub struct TokioSpawner(tokio::runtime::Handle);

#[cfg(feature = "tokio")]
impl TokioSpawner {
  /// Creates a spawner bound to the Tokio runtime the caller is running in,
  /// or `None` outside of one.
  pub fn try_current() -> Option<Self> {
    tokio::runtime::Handle::try_current().ok().map(Self)
  }

  pub fn from_handle(handle: tokio::runtime::Handle) -> Self {
    Self(handle)
  }
}

#[cfg(feature = "tokio")]
impl TaskSpawner for TokioSpawner {
  fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) {
    self.0.spawn(future);
  }
}

/// Picks the spawner for a cache that needs one: the configured spawner,
/// else the ambient Tokio runtime when the `tokio` feature is on.
pub(crate) fn resolve_spawner(
  configured: Option<std::sync::Arc<dyn TaskSpawner>>,
) -> Option<std::sync::Arc<dyn TaskSpawner>> {
  if configured.is_some() {
    return configured;
  }
  #[cfg(feature = "tokio")]
  {
    if let Some(spawner) = TokioSpawner::try_current() {
      return Some(std::sync::Arc::new(spawner));
    }
  }
  None
}
