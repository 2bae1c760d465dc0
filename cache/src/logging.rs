//! The debug-logging switch.
//!
//! There is one process-wide flag, off by default, that can be flipped at
//! any time. Each cache captures a [`DebugLogging`] at build time holding an
//! optional per-cache override; without an override the cache reads the
//! process-wide flag at the moment it logs, so toggling affects caches built
//! before and after the call alike.
//!
//! Events go through `tracing`; installing a subscriber is up to the host.

use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_LOGGING: AtomicBool = AtomicBool::new(false);

pub fn enable_debug_logging() {
  DEBUG_LOGGING.store(true, Ordering::Relaxed);
}

pub fn disable_debug_logging() {
  DEBUG_LOGGING.store(false, Ordering::Relaxed);
}

pub fn is_debug_logging_enabled() -> bool {
  DEBUG_LOGGING.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DebugLogging {
  per_cache: Option<bool>,
}

impl DebugLogging {
  pub(crate) fn new(per_cache: Option<bool>) -> Self {
    Self { per_cache }
  }

  pub(crate) fn enabled(&self) -> bool {
    self.per_cache.unwrap_or_else(is_debug_logging_enabled)
  }
}

/// Emits a `tracing::debug!` event when the given switch is on.
macro_rules! debug_log {
  ($switch:expr, $($arg:tt)+) => {
    if $switch.enabled() {
      tracing::debug!($($arg)+);
    }
  };
}

pub(crate) use debug_log;
