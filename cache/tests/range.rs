mod common;

use common::{points_in, settle, Calls};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::sync::Arc;
use std::time::Duration;
use suspend_cache::{
  AbortSignal, BuildError, EvictionStore, MapStore, OnEvict, RangeCache, RangeCacheBuilder, Span, SpanIndex, Suspend,
};

type Requests = Arc<Mutex<Vec<Vec<Span<i32>>>>>;

type IntBuilder = RangeCacheBuilder<&'static str, &'static str, i32, i32>;

// A range cache over integer points whose loader returns every point in
// the requested gaps and records what it was asked for.
fn int_range_cache(delay_ms: u64) -> (RangeCache<&'static str, &'static str, i32, i32>, Requests) {
  let (builder, requests) = int_range_builder(delay_ms);
  (builder.build().unwrap(), requests)
}

fn int_range_builder(delay_ms: u64) -> (IntBuilder, Requests) {
  let requests: Requests = Arc::default();
  let log = requests.clone();
  let builder = RangeCacheBuilder::new(
    move |_feed: &'static str, gaps: Vec<Span<i32>>, _signal: AbortSignal| {
      log.lock().push(gaps.clone());
      async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok::<_, String>(gaps.iter().flat_map(points_in).collect::<Vec<i32>>())
      }
    },
    |a: &i32, b: &i32| a.cmp(b),
    |value: &i32| *value,
  );
  (builder, requests)
}

fn values(result: &[Arc<i32>]) -> Vec<i32> {
  result.iter().map(|v| **v).collect()
}

#[tokio::test]
async fn test_covered_subrange_needs_no_load() {
  let (cache, requests) = int_range_cache(1);

  assert_eq!(values(&cache.fetch(0, 10, &"a").await.unwrap()), (0..=10).collect::<Vec<_>>());
  assert_eq!(values(&cache.fetch(3, 7, &"a").await.unwrap()), vec![3, 4, 5, 6, 7]);

  assert_eq!(requests.lock().len(), 1);
  assert!(matches!(cache.get(3, 7, &"a"), Suspend::Ready(_)));
}

#[tokio::test]
async fn test_wider_query_loads_only_the_gaps_in_one_call() {
  let (cache, requests) = int_range_cache(1);

  cache.fetch(3, 7, &"a").await.unwrap();
  let all = cache.fetch(0, 10, &"a").await.unwrap();

  assert_eq!(values(&all), (0..=10).collect::<Vec<_>>());
  let requests = requests.lock();
  assert_eq!(requests.len(), 2);
  assert_eq!(
    requests[1],
    vec![Span::new(Included(0), Excluded(3)), Span::new(Excluded(7), Included(10))]
  );
  assert_eq!(cache.loaded_spans(&"a"), vec![Span::closed(0, 10)]);
}

#[tokio::test]
async fn test_loaded_spans_never_overlap_or_touch() {
  let (cache, _requests) = int_range_cache(0);

  for (start, end) in [(10, 12), (0, 2), (20, 25), (2, 5), (11, 21), (30, 31), (6, 9)] {
    cache.fetch(start, end, &"a").await.unwrap();
  }

  let spans = cache.loaded_spans(&"a");
  assert_eq!(
    spans,
    vec![
      Span::closed(0, 5),
      Span::new(Included(6), Included(9)),
      Span::closed(10, 25),
      Span::closed(30, 31)
    ]
  );
  for pair in spans.windows(2) {
    let (Included(end) | Excluded(end)) = pair[0].end else {
      panic!("bounded span expected");
    };
    let (Included(start) | Excluded(start)) = pair[1].start else {
      panic!("bounded span expected");
    };
    assert!(end < start);
  }
}

#[tokio::test]
async fn test_adjacent_loads_cover_their_union() {
  // For a <= b <= c, loading [a, b] and [b, c] covers [a, c].
  for (a, b, c) in [(0, 0, 0), (0, 5, 9), (-4, -4, 2), (1, 7, 7)] {
    let (cache, requests) = int_range_cache(0);
    cache.fetch(a, b, &"a").await.unwrap();
    cache.fetch(b, c, &"a").await.unwrap();
    let before = requests.lock().len();

    let all = cache.fetch(a, c, &"a").await.unwrap();
    assert_eq!(requests.lock().len(), before, "no extra load for [{a}, {c}]");
    assert_eq!(values(&all), (a..=c).collect::<Vec<_>>());
  }
}

#[tokio::test]
async fn test_keys_keep_separate_indexes() {
  let (cache, requests) = int_range_cache(0);
  cache.fetch(0, 3, &"a").await.unwrap();
  cache.fetch(0, 3, &"b").await.unwrap();

  assert_eq!(requests.lock().len(), 2);
  assert!(cache.invalidate(&"a"));
  assert!(cache.loaded_spans(&"a").is_empty());
  assert_eq!(cache.loaded_spans(&"b"), vec![Span::closed(0, 3)]);
  assert!(cache.peek(0, 3, &"b").is_some());
  assert!(cache.peek(0, 4, &"b").is_none());
}

#[tokio::test]
async fn test_concurrent_overlapping_queries_share_loads() {
  let (cache, requests) = int_range_cache(50);

  let first = cache.get_async(0, 10, &"a");
  let second = cache.get_async(5, 15, &"a");
  let repeat = cache.get_async(0, 10, &"a");
  assert!(first.ptr_eq(&repeat));

  assert_eq!(values(&second.await.unwrap()), (5..=15).collect::<Vec<_>>());
  assert_eq!(values(&first.await.unwrap()), (0..=10).collect::<Vec<_>>());

  let requests = requests.lock();
  assert_eq!(requests.len(), 2);
  assert_eq!(requests[1], vec![Span::new(Excluded(10), Included(15))]);
}

#[tokio::test]
async fn test_failed_gap_rejects_only_its_queries() {
  let calls = Calls::default();
  let cache = {
    let calls = calls.clone();
    RangeCacheBuilder::new(
      move |_: (), gaps: Vec<Span<i32>>, _signal| {
        calls.bump();
        async move {
          let points: Vec<i32> = gaps.iter().flat_map(points_in).collect();
          if points.contains(&13) {
            Err("point 13 is cursed".to_string())
          } else {
            Ok(points)
          }
        }
      },
      |a: &i32, b: &i32| a.cmp(b),
      |value: &i32| *value,
    )
    .split_gaps(true)
    .build()
    .unwrap()
  };

  cache.fetch(5, 8, &()).await.unwrap();

  // Gaps [0, 5) and (8, 15]: the second one fails.
  let error = cache.fetch(0, 15, &()).await.unwrap_err();
  assert_eq!(error.load_error().unwrap().to_string(), "point 13 is cursed");
  assert_eq!(calls.get(), 3);

  // The good gap and the earlier data stay cached.
  settle().await;
  assert_eq!(cache.loaded_spans(&()), vec![Span::new(Included(0), Included(8))]);
  assert_eq!(values(&cache.fetch(0, 8, &()).await.unwrap()), (0..=8).collect::<Vec<_>>());
  assert_eq!(calls.get(), 3);
  assert_eq!(cache.metrics().loads_failed, 1);

  // Anything reaching into the failed gap re-raises without a new load.
  assert!(cache.fetch(0, 15, &()).await.is_err());
  assert!(matches!(cache.get(12, 20, &()), Suspend::Failed(_)));
  assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn test_failed_range_is_remembered_until_invalidated() {
  let calls = Calls::default();
  let cache = {
    let calls = calls.clone();
    RangeCacheBuilder::new(
      move |_: (), _gaps: Vec<Span<i32>>, _signal| {
        calls.bump();
        async move { Err::<Vec<i32>, _>("backend down".to_string()) }
      },
      |a: &i32, b: &i32| a.cmp(b),
      |value: &i32| *value,
    )
    .build()
    .unwrap()
  };

  let error = cache.fetch(0, 5, &()).await.unwrap_err();
  assert_eq!(calls.get(), 1);

  match cache.get(0, 5, &()) {
    Suspend::Failed(again) => assert_eq!(again.to_string(), error.to_string()),
    _ => panic!("the stored error should be raised again"),
  }
  assert!(matches!(cache.get(2, 3, &()), Suspend::Failed(_)));
  assert_eq!(calls.get(), 1);

  assert!(cache.invalidate(&()));
  assert!(cache.fetch(0, 5, &()).await.is_err());
  assert_eq!(calls.get(), 2);
}

#[tokio::test]
async fn test_capacity_bounds_the_keys_kept() {
  let (builder, requests) = int_range_builder(0);
  let cache = builder.capacity(2).build().unwrap();

  cache.fetch(0, 3, &"a").await.unwrap();
  cache.fetch(0, 3, &"b").await.unwrap();
  // Query "a" again so that "b" is the least recently used.
  cache.fetch(1, 2, &"a").await.unwrap();
  cache.fetch(0, 3, &"c").await.unwrap();

  assert_eq!(cache.len(), 2);
  assert_eq!(cache.metrics().evictions, 1);
  assert!(cache.loaded_spans(&"b").is_empty());
  assert_eq!(cache.loaded_spans(&"a"), vec![Span::closed(0, 3)]);

  cache.fetch(0, 3, &"b").await.unwrap();
  assert_eq!(requests.lock().len(), 4);
}

#[tokio::test]
async fn test_evicted_key_still_completes_its_queries() {
  let (builder, requests) = int_range_builder(50);
  let cache = builder.capacity(1).build().unwrap();

  let slow = cache.get_async(0, 4, &"a");
  cache.fetch(0, 1, &"b").await.unwrap();
  assert_eq!(cache.metrics().evictions, 1);

  assert_eq!(values(&slow.await.unwrap()), vec![0, 1, 2, 3, 4]);
  assert!(cache.loaded_spans(&"a").is_empty());
  assert_eq!(requests.lock().len(), 2);
}

#[tokio::test]
async fn test_custom_store_for_span_indexes() {
  let (builder, _requests) = int_range_builder(0);
  let cache = builder
    .store(|_: OnEvict<&'static str>| {
      Box::new(MapStore::<&'static str, SpanIndex<i32, i32>>::new())
        as Box<dyn EvictionStore<&'static str, SpanIndex<i32, i32>>>
    })
    .build()
    .unwrap();

  for key in ["a", "b", "c"] {
    cache.fetch(0, 2, &key).await.unwrap();
  }
  assert_eq!(cache.len(), 3);
  assert_eq!(cache.evict_all(), 3);
  assert!(cache.is_empty());

  let (builder, _requests) = int_range_builder(0);
  assert_eq!(builder.capacity(0).build().unwrap_err(), BuildError::ZeroCapacity);
}

#[tokio::test]
async fn test_invalidate_aborts_pending_queries() {
  let (cache, _requests) = int_range_cache(500);
  let waiting = cache.get_async(0, 5, &"a");

  assert!(cache.invalidate(&"a"));
  assert!(waiting.await.unwrap_err().is_aborted());
  assert!(cache.loaded_spans(&"a").is_empty());
}

#[tokio::test]
async fn test_custom_comparator_over_strings() {
  // Case-insensitive ordering of words.
  let compare = |a: &String, b: &String| a.to_lowercase().cmp(&b.to_lowercase());
  let words = ["apple", "Banana", "cherry", "Damson", "elder", "fig"];
  let requests = Arc::new(Mutex::new(0usize));

  let cache = {
    let requests = requests.clone();
    RangeCacheBuilder::new(
      move |_: (), gaps: Vec<Span<String>>, _signal| {
        *requests.lock() += 1;
        let found: Vec<String> = words
          .iter()
          .map(|w| w.to_string())
          .filter(|w| {
            gaps.iter().any(|gap| {
              let after_start = match &gap.start {
                Included(s) => compare(w, s) != Ordering::Less,
                Excluded(s) => compare(w, s) == Ordering::Greater,
                Unbounded => true,
              };
              let before_end = match &gap.end {
                Included(e) => compare(w, e) != Ordering::Greater,
                Excluded(e) => compare(w, e) == Ordering::Less,
                Unbounded => true,
              };
              after_start && before_end
            })
          })
          .collect();
        async move { Ok::<_, String>(found) }
      },
      compare,
      |word: &String| word.clone(),
    )
    .build()
    .unwrap()
  };

  let first = cache.fetch("a".to_string(), "c".to_string(), &()).await.unwrap();
  assert_eq!(first.iter().map(|w| w.as_str()).collect::<Vec<_>>(), vec!["apple", "Banana"]);

  let wider = cache.fetch("A".to_string(), "E".to_string(), &()).await.unwrap();
  assert_eq!(
    wider.iter().map(|w| w.as_str()).collect::<Vec<_>>(),
    vec!["apple", "Banana", "cherry", "Damson"]
  );
  assert_eq!(*requests.lock(), 2);
}

#[test]
fn test_sync_range_loader() {
  let cache = RangeCacheBuilder::with_sync_loader(
    |_: (), gaps: Vec<Span<i32>>, _signal| Ok::<_, String>(gaps.iter().flat_map(points_in).collect::<Vec<i32>>()),
    |a: &i32, b: &i32| a.cmp(b),
    |value: &i32| *value,
  )
  .build()
  .unwrap();

  let values = cache.get_async(1, 4, &()).wait().unwrap();
  assert_eq!(values.len(), 4);
  assert_eq!(cache.evict_all(), 1);
  assert!(cache.loaded_spans(&()).is_empty());
}
