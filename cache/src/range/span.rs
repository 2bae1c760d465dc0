//! Bound arithmetic over a caller-supplied point ordering.
//!
//! Nothing here assumes `T: Ord`; every comparison goes through the
//! comparator handed to the cache.

use std::cmp::Ordering;
use std::ops::Bound::{self, Excluded, Included, Unbounded};

pub(crate) type Compare<T> = dyn Fn(&T, &T) -> Ordering + Send + Sync;

/// How a gap meets the covered span next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Boundaries {
  /// A gap stops just short of covered data: covering `[3, 7]` and asking
  /// for `[0, 10]` leaves `[0, 3)` and `(7, 10]`.
  Exclusive,
  /// A gap shares its edge points with covered data: `[0, 3]` and `[7, 10]`.
  Shared,
}

/// A contiguous stretch of points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<T> {
  pub start: Bound<T>,
  pub end: Bound<T>,
}

impl<T> Span<T> {
  pub fn new(start: Bound<T>, end: Bound<T>) -> Self {
    Self { start, end }
  }

  /// `[start, end]`
  pub fn closed(start: T, end: T) -> Self {
    Self::new(Included(start), Included(end))
  }

  /// Every point.
  pub fn full() -> Self {
    Self::new(Unbounded, Unbounded)
  }
}

fn cmp_points<T>(a: &T, b: &T, cmp: &Compare<T>) -> Ordering {
  cmp(a, b)
}

/// Orders start bounds: `Unbounded` first, and `[x` before `(x`.
pub(crate) fn start_cmp<T>(a: &Bound<T>, b: &Bound<T>, cmp: &Compare<T>) -> Ordering {
  match (a, b) {
    (Unbounded, Unbounded) => Ordering::Equal,
    (Unbounded, _) => Ordering::Less,
    (_, Unbounded) => Ordering::Greater,
    (Included(x), Included(y)) | (Excluded(x), Excluded(y)) => cmp_points(x, y, cmp),
    (Included(x), Excluded(y)) => cmp_points(x, y, cmp).then(Ordering::Less),
    (Excluded(x), Included(y)) => cmp_points(x, y, cmp).then(Ordering::Greater),
  }
}

/// Orders end bounds: `Unbounded` last, and `x)` before `x]`.
pub(crate) fn end_cmp<T>(a: &Bound<T>, b: &Bound<T>, cmp: &Compare<T>) -> Ordering {
  match (a, b) {
    (Unbounded, Unbounded) => Ordering::Equal,
    (Unbounded, _) => Ordering::Greater,
    (_, Unbounded) => Ordering::Less,
    (Included(x), Included(y)) | (Excluded(x), Excluded(y)) => cmp_points(x, y, cmp),
    (Included(x), Excluded(y)) => cmp_points(x, y, cmp).then(Ordering::Greater),
    (Excluded(x), Included(y)) => cmp_points(x, y, cmp).then(Ordering::Less),
  }
}

pub(crate) fn min_end<'a, T>(a: &'a Bound<T>, b: &'a Bound<T>, cmp: &Compare<T>) -> &'a Bound<T> {
  if end_cmp(a, b, cmp) == Ordering::Greater {
    b
  } else {
    a
  }
}

pub(crate) fn max_end<'a, T>(a: &'a Bound<T>, b: &'a Bound<T>, cmp: &Compare<T>) -> &'a Bound<T> {
  if end_cmp(a, b, cmp) == Ordering::Less {
    b
  } else {
    a
  }
}

pub(crate) fn min_start<'a, T>(a: &'a Bound<T>, b: &'a Bound<T>, cmp: &Compare<T>) -> &'a Bound<T> {
  if start_cmp(a, b, cmp) == Ordering::Greater {
    b
  } else {
    a
  }
}

pub(crate) fn max_start<'a, T>(a: &'a Bound<T>, b: &'a Bound<T>, cmp: &Compare<T>) -> &'a Bound<T> {
  if start_cmp(a, b, cmp) == Ordering::Less {
    b
  } else {
    a
  }
}

/// Whether some point lies between `start` and `end`, judged by the bounds
/// alone.
pub(crate) fn is_nonempty<T>(start: &Bound<T>, end: &Bound<T>, cmp: &Compare<T>) -> bool {
  match (start, end) {
    (Unbounded, _) | (_, Unbounded) => true,
    (Included(x), Included(y)) => cmp(x, y) != Ordering::Greater,
    (Included(x), Excluded(y)) | (Excluded(x), Included(y)) | (Excluded(x), Excluded(y)) => {
      cmp(x, y) == Ordering::Less
    }
  }
}

/// Whether a span ending at `end` overlaps or touches one starting at
/// `start`, so the two coalesce without leaving a point out.
pub(crate) fn connects<T>(end: &Bound<T>, start: &Bound<T>, cmp: &Compare<T>) -> bool {
  match (end, start) {
    (Unbounded, _) | (_, Unbounded) => true,
    (Excluded(x), Excluded(y)) => cmp(y, x) == Ordering::Less,
    (Included(x), Included(y)) | (Included(x), Excluded(y)) | (Excluded(x), Included(y)) => {
      cmp(y, x) != Ordering::Greater
    }
  }
}

/// Whether a span ending at `end` lies wholly before one starting at
/// `start`, sharing no point.
pub(crate) fn ends_before<T>(end: &Bound<T>, start: &Bound<T>, cmp: &Compare<T>) -> bool {
  match (end, start) {
    (Unbounded, _) | (_, Unbounded) => false,
    (Included(x), Included(y)) => cmp(x, y) == Ordering::Less,
    (Included(x), Excluded(y)) | (Excluded(x), Included(y)) | (Excluded(x), Excluded(y)) => {
      cmp(x, y) != Ordering::Greater
    }
  }
}

/// Whether `point` lies before everything a span starting at `start` holds.
pub(crate) fn precedes<T>(point: &T, start: &Bound<T>, cmp: &Compare<T>) -> bool {
  match start {
    Unbounded => false,
    Included(s) => cmp(point, s) == Ordering::Less,
    Excluded(s) => cmp(point, s) != Ordering::Greater,
  }
}

/// Whether `point` lies after everything a span ending at `end` holds.
pub(crate) fn follows<T>(point: &T, end: &Bound<T>, cmp: &Compare<T>) -> bool {
  match end {
    Unbounded => false,
    Included(e) => cmp(point, e) == Ordering::Greater,
    Excluded(e) => cmp(point, e) != Ordering::Less,
  }
}

impl<T> Span<T> {
  pub(crate) fn is_nonempty(&self, cmp: &Compare<T>) -> bool {
    is_nonempty(&self.start, &self.end, cmp)
  }

  pub(crate) fn contains(&self, point: &T, cmp: &Compare<T>) -> bool {
    !precedes(point, &self.start, cmp) && !follows(point, &self.end, cmp)
  }

  pub(crate) fn overlaps(&self, other: &Span<T>, cmp: &Compare<T>) -> bool {
    !ends_before(&self.end, &other.start, cmp) && !ends_before(&other.end, &self.start, cmp)
  }

  pub(crate) fn same_as(&self, other: &Span<T>, cmp: &Compare<T>) -> bool {
    start_cmp(&self.start, &other.start, cmp) == Ordering::Equal
      && end_cmp(&self.end, &other.end, cmp) == Ordering::Equal
  }
}

impl<T: Clone> Span<T> {
  /// The smallest span holding both `self` and `other`.
  pub(crate) fn hull(&self, other: &Span<T>, cmp: &Compare<T>) -> Span<T> {
    Span::new(
      min_start(&self.start, &other.start, cmp).clone(),
      max_end(&self.end, &other.end, cmp).clone(),
    )
  }
}

impl Boundaries {
  /// The end of a gap that stops at covered data starting at `start`.
  fn gap_end<T: Clone>(self, start: &Bound<T>) -> Bound<T> {
    match (self, start) {
      (_, Unbounded) => Unbounded,
      (Boundaries::Exclusive, Included(x)) => Excluded(x.clone()),
      (Boundaries::Exclusive, Excluded(x)) => Included(x.clone()),
      (Boundaries::Shared, Included(x) | Excluded(x)) => Included(x.clone()),
    }
  }

  /// The start of a gap that resumes after covered data ending at `end`.
  fn gap_start<T: Clone>(self, end: &Bound<T>) -> Bound<T> {
    match (self, end) {
      (_, Unbounded) => Unbounded,
      (Boundaries::Exclusive, Included(x)) => Excluded(x.clone()),
      (Boundaries::Exclusive, Excluded(x)) => Included(x.clone()),
      (Boundaries::Shared, Included(x) | Excluded(x)) => Included(x.clone()),
    }
  }
}

/// Sorts spans by start and merges every pair that connects.
pub(crate) fn coalesce<T: Clone>(mut spans: Vec<Span<T>>, cmp: &Compare<T>) -> Vec<Span<T>> {
  spans.sort_by(|a, b| start_cmp(&a.start, &b.start, cmp));
  let mut merged: Vec<Span<T>> = Vec::with_capacity(spans.len());
  for span in spans {
    match merged.last_mut() {
      Some(last) if connects(&last.end, &span.start, cmp) => {
        if end_cmp(&span.end, &last.end, cmp) == Ordering::Greater {
          last.end = span.end;
        }
      }
      _ => merged.push(span),
    }
  }
  merged
}

/// The maximal stretches of `query` not covered by `blockers`, in order.
///
/// `blockers` must be sorted and coalesced.
pub(crate) fn gaps<T: Clone>(
  query: &Span<T>,
  blockers: &[Span<T>],
  mode: Boundaries,
  cmp: &Compare<T>,
) -> Vec<Span<T>> {
  let mut gaps = Vec::new();
  if !query.is_nonempty(cmp) {
    return gaps;
  }

  let first = blockers.partition_point(|s| ends_before(&s.end, &query.start, cmp));
  let mut cursor = query.start.clone();
  for blocker in &blockers[first..] {
    if ends_before(&query.end, &blocker.start, cmp) {
      break;
    }
    if start_cmp(&cursor, &blocker.start, cmp) == Ordering::Less {
      let stop = mode.gap_end(&blocker.start);
      let end = min_end(&stop, &query.end, cmp).clone();
      if is_nonempty(&cursor, &end, cmp) {
        gaps.push(Span::new(cursor.clone(), end));
      }
    }
    if end_cmp(&blocker.end, &query.end, cmp) != Ordering::Less {
      return gaps;
    }
    let resume = mode.gap_start(&blocker.end);
    cursor = max_start(&cursor, &resume, cmp).clone();
  }

  if is_nonempty(&cursor, &query.end, cmp) {
    gaps.push(Span::new(cursor, query.end.clone()));
  }
  gaps
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ints(a: &i32, b: &i32) -> Ordering {
    a.cmp(b)
  }

  fn gaps_of(query: Span<i32>, covered: Vec<Span<i32>>, mode: Boundaries) -> Vec<Span<i32>> {
    let blockers = coalesce(covered, &ints);
    gaps(&query, &blockers, mode, &ints)
  }

  #[test]
  fn exclusive_gaps_stop_short_of_covered_points() {
    let found = gaps_of(Span::closed(0, 10), vec![Span::closed(3, 7)], Boundaries::Exclusive);
    assert_eq!(
      found,
      vec![Span::new(Included(0), Excluded(3)), Span::new(Excluded(7), Included(10))]
    );
  }

  #[test]
  fn shared_gaps_reuse_edge_points() {
    let found = gaps_of(Span::closed(0, 10), vec![Span::closed(3, 7)], Boundaries::Shared);
    assert_eq!(found, vec![Span::closed(0, 3), Span::closed(7, 10)]);
  }

  #[test]
  fn fully_covered_query_has_no_gaps() {
    let found = gaps_of(Span::closed(3, 7), vec![Span::closed(0, 10)], Boundaries::Exclusive);
    assert!(found.is_empty());
  }

  #[test]
  fn uncovered_query_is_one_gap() {
    let found = gaps_of(Span::closed(0, 5), vec![Span::closed(8, 9)], Boundaries::Exclusive);
    assert_eq!(found, vec![Span::closed(0, 5)]);
  }

  #[test]
  fn gaps_between_several_blockers() {
    let found = gaps_of(
      Span::closed(0, 20),
      vec![Span::closed(12, 14), Span::closed(2, 4), Span::closed(-5, 0)],
      Boundaries::Exclusive,
    );
    assert_eq!(
      found,
      vec![
        Span::new(Excluded(0), Excluded(2)),
        Span::new(Excluded(4), Excluded(12)),
        Span::new(Excluded(14), Included(20)),
      ]
    );
  }

  #[test]
  fn unbounded_query_around_covered_middle() {
    let found = gaps_of(Span::full(), vec![Span::closed(3, 7)], Boundaries::Shared);
    assert_eq!(
      found,
      vec![Span::new(Unbounded, Included(3)), Span::new(Included(7), Unbounded)]
    );
  }

  #[test]
  fn coalesce_merges_touching_spans() {
    let merged = coalesce(
      vec![
        Span::new(Included(5), Included(9)),
        Span::new(Included(0), Excluded(5)),
        Span::new(Excluded(9), Included(12)),
        Span::closed(20, 30),
      ],
      &ints,
    );
    assert_eq!(merged, vec![Span::closed(0, 12), Span::closed(20, 30)]);
  }

  #[test]
  fn open_ends_on_the_same_point_do_not_connect() {
    assert!(!connects(&Excluded(5), &Excluded(5), &ints));
    assert!(connects(&Included(5), &Excluded(5), &ints));
    assert!(connects(&Excluded(5), &Included(5), &ints));
  }

  #[test]
  fn bound_orderings() {
    assert_eq!(start_cmp(&Included(1), &Excluded(1), &ints), Ordering::Less);
    assert_eq!(end_cmp(&Excluded(1), &Included(1), &ints), Ordering::Less);
    assert_eq!(start_cmp(&Unbounded, &Included(i32::MIN), &ints), Ordering::Less);
    assert_eq!(end_cmp(&Unbounded, &Included(i32::MAX), &ints), Ordering::Greater);
  }

  #[test]
  fn reversed_comparator_is_respected() {
    let reversed = |a: &i32, b: &i32| b.cmp(a);
    let blockers = coalesce(vec![Span::closed(7, 3)], &reversed);
    let found = gaps(&Span::closed(10, 0), &blockers, Boundaries::Shared, &reversed);
    assert_eq!(found, vec![Span::closed(10, 7), Span::closed(3, 0)]);
  }
}
