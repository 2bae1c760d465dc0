mod common;

use common::{settle, Calls};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use suspend_cache::{CacheBuilder, RecordStatus};

#[tokio::test]
async fn test_abort_rejects_waiters_and_signals_the_loader() {
  let saw_abort = Arc::new(AtomicBool::new(false));
  let calls = Calls::default();
  let cache = {
    let saw_abort = saw_abort.clone();
    let calls = calls.clone();
    CacheBuilder::new(move |key: i32, signal: suspend_cache::AbortSignal| {
      let saw_abort = saw_abort.clone();
      let calls = calls.clone();
      calls.bump();
      signal.on_abort(move || saw_abort.store(true, Ordering::SeqCst));
      async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok::<_, String>(key)
      }
    })
    .use_weak_ref(false)
    .build()
    .unwrap()
  };

  let waiting = cache.get_async(&1);
  assert!(cache.abort(&1));

  let error = waiting.clone().await.unwrap_err();
  assert!(error.is_aborted());
  assert!(saw_abort.load(Ordering::SeqCst));
  assert_eq!(cache.status(&1), None, "Aborted records are removed");
  assert_eq!(cache.metrics().aborts, 1);

  // The next read starts over.
  let restarted = cache.get_async(&1);
  assert_eq!(cache.status(&1), Some(RecordStatus::Pending));
  assert!(!restarted.ptr_eq(&waiting));
  assert_eq!(calls.get(), 2);
}

#[tokio::test]
async fn test_abort_ignores_settled_records() {
  let cache = CacheBuilder::new(|key: i32, _signal| async move { Ok::<_, String>(key) })
    .use_weak_ref(false)
    .build()
    .unwrap();

  cache.fetch(&1).await.unwrap();
  assert!(!cache.abort(&1));
  assert!(!cache.abort(&2));
  assert_eq!(cache.status(&1), Some(RecordStatus::Resolved));
}

#[tokio::test]
async fn test_invalidating_a_pending_key_aborts_its_load() {
  let cache = CacheBuilder::new(|key: i32, signal: suspend_cache::AbortSignal| async move {
    signal.aborted().await;
    Ok::<_, String>(key)
  })
  .use_weak_ref(false)
  .build()
  .unwrap();

  let waiting = cache.get_async(&9);
  assert!(cache.invalidate(&9));
  assert!(waiting.await.unwrap_err().is_aborted());
}

#[tokio::test]
async fn test_late_results_do_not_overwrite_an_abort() {
  let cache = CacheBuilder::new(|key: i32, _signal| async move {
    // Ignores the signal entirely.
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok::<_, String>(key)
  })
  .use_weak_ref(false)
  .build()
  .unwrap();

  let record_future = cache.get_async(&5);
  cache.abort(&5);
  settle().await;
  assert!(record_future.error().unwrap().is_aborted());
  assert_eq!(cache.status(&5), None);
}

#[tokio::test]
async fn test_dropping_the_cache_aborts_loads_in_flight() {
  let cache = CacheBuilder::new(|key: i32, _signal| async move {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Ok::<_, String>(key)
  })
  .use_weak_ref(false)
  .build()
  .unwrap();

  let waiting = cache.get_async(&1);
  drop(cache);
  assert!(waiting.await.unwrap_err().is_aborted());
}

#[tokio::test]
async fn test_refresh_aborts_nothing_when_settled_but_restarts_the_loader() {
  let calls = Calls::default();
  let cache = {
    let calls = calls.clone();
    CacheBuilder::new(move |key: i32, _signal| {
      calls.bump();
      async move { Ok::<_, String>(key) }
    })
    .use_weak_ref(false)
    .build()
    .unwrap()
  };

  let first = cache.fetch(&1).await.unwrap();
  let second = cache.refresh(&1).unwrap().await.unwrap();
  assert_eq!(*first, *second);
  assert_eq!(calls.get(), 2);
  assert_eq!(cache.metrics().aborts, 0);
}
