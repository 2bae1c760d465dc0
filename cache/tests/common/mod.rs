#![allow(dead_code)]

use std::ops::Bound;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;

use parking_lot::Mutex;
use suspend_cache::{Cache, CacheBuilder, RecordStatus, Span};

/// Counts loader invocations.
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
  pub fn bump(&self) {
    self.0.fetch_add(1, Ordering::SeqCst);
  }

  pub fn get(&self) -> usize {
    self.0.load(Ordering::SeqCst)
  }
}

// A strongly held cache whose loader doubles the key after a short delay.
pub fn doubling_cache(calls: &Calls, delay_ms: u64) -> Cache<i32, i32, i32> {
  let calls = calls.clone();
  CacheBuilder::new(move |key: i32, _signal| {
    let calls = calls.clone();
    async move {
      calls.bump();
      tokio::time::sleep(Duration::from_millis(delay_ms)).await;
      Ok::<_, String>(key * 2)
    }
  })
  .use_weak_ref(false)
  .build()
  .unwrap()
}

/// Collects status notifications.
#[derive(Clone, Default)]
pub struct StatusLog(Arc<Mutex<Vec<Option<RecordStatus>>>>);

impl StatusLog {
  pub fn recorder(&self) -> impl Fn(Option<RecordStatus>) + Send + Sync + 'static {
    let log = self.0.clone();
    move |status| log.lock().push(status)
  }

  pub fn entries(&self) -> Vec<Option<RecordStatus>> {
    self.0.lock().clone()
  }
}

/// Every integer inside a bounded span.
pub fn points_in(span: &Span<i32>) -> Vec<i32> {
  let start = match span.start {
    Bound::Included(s) => s,
    Bound::Excluded(s) => s + 1,
    Bound::Unbounded => panic!("unbounded range in test"),
  };
  let end = match span.end {
    Bound::Included(e) => e,
    Bound::Excluded(e) => e - 1,
    Bound::Unbounded => panic!("unbounded range in test"),
  };
  (start..=end).collect()
}

pub async fn settle() {
  tokio::time::sleep(Duration::from_millis(30)).await;
}
