use parking_lot::Mutex;
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::sync::Arc;
use suspend_cache::{IntervalCache, RangeCacheBuilder, Span};

#[derive(Debug, Clone, PartialEq)]
struct Reading {
  at: f64,
}

type Requests = Arc<Mutex<Vec<Span<f64>>>>;

// Readings every half unit between -10 and 10.
fn readings_cache() -> (IntervalCache<u8, u8, f64, Reading>, Requests) {
  let requests: Requests = Arc::default();
  let log = requests.clone();
  let cache = RangeCacheBuilder::new(
    move |_sensor: u8, gaps: Vec<Span<f64>>, _signal| {
      log.lock().extend(gaps.iter().cloned());
      let found: Vec<Reading> = (-20..=20)
        .map(|i| Reading { at: i as f64 / 2.0 })
        .filter(|r| gaps.iter().any(|gap| holds(gap, r.at)))
        .collect();
      async move { Ok::<_, String>(found) }
    },
    |a: &f64, b: &f64| a.total_cmp(b),
    |reading: &Reading| reading.at,
  )
  .build_interval()
  .unwrap();
  (cache, requests)
}

fn holds(span: &Span<f64>, x: f64) -> bool {
  let after = match span.start {
    Included(s) => x >= s,
    Excluded(s) => x > s,
    Unbounded => true,
  };
  let before = match span.end {
    Included(e) => x <= e,
    Excluded(e) => x < e,
    Unbounded => true,
  };
  after && before
}

#[tokio::test]
async fn test_interval_gaps_share_edges() {
  let (cache, requests) = readings_cache();

  cache.fetch(Span::closed(3.0, 7.0), &1).await.unwrap();
  let all = cache.fetch(Span::closed(0.0, 10.0), &1).await.unwrap();

  assert_eq!(all.len(), 21);
  assert_eq!(all.first().unwrap().at, 0.0);
  assert_eq!(all.last().unwrap().at, 10.0);
  assert_eq!(
    requests.lock()[1..].to_vec(),
    vec![Span::closed(0.0, 3.0), Span::closed(7.0, 10.0)]
  );
  assert_eq!(cache.loaded_spans(&1), vec![Span::closed(0.0, 10.0)]);
}

#[tokio::test]
async fn test_unbounded_intervals() {
  let (cache, requests) = readings_cache();

  cache.fetch(Span::closed(-1.0, 1.0), &1).await.unwrap();
  let everything = cache.fetch(Span::full(), &1).await.unwrap();
  assert_eq!(everything.len(), 41);
  assert_eq!(
    requests.lock()[1..].to_vec(),
    vec![Span::new(Unbounded, Included(-1.0)), Span::new(Included(1.0), Unbounded)]
  );

  // Any later interval is covered.
  let tail = cache.get_bounds(Excluded(9.0), Unbounded, &1);
  assert_eq!(tail.ready().unwrap().len(), 2);
  assert_eq!(cache.loaded_spans(&1), vec![Span::full()]);
  assert_eq!(requests.lock().len(), 3);
}

#[tokio::test]
async fn test_open_intervals_and_peek() {
  let (cache, _requests) = readings_cache();

  let open = cache
    .fetch(Span::new(Excluded(0.0), Excluded(2.0)), &2)
    .await
    .unwrap();
  assert_eq!(open.iter().map(|r| r.at).collect::<Vec<_>>(), vec![0.5, 1.0, 1.5]);

  assert!(cache.peek(&Span::closed(0.5, 1.5), &2).is_some());
  assert!(cache.peek(&Span::closed(0.0, 1.0), &2).is_none());
  assert!(cache.peek(&Span::closed(0.5, 1.0), &3).is_none());
}
