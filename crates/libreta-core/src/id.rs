//! Node id allocation.
//!
//! Ids are the UTC wall-clock second formatted as `YYYYMMDD-HHMMSS`, so they
//! read as dates and sort chronologically across seconds. The second and
//! later ids within one second get a `-N` suffix.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::node::NodeId;

const ID_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Allocates unique [`NodeId`]s.
///
/// Each instance keeps its own last-second/counter pair, so independent
/// generators may hand out the same ids. A store owns exactly one.
#[derive(Debug, Default)]
pub struct IdGenerator {
  /// Last issued `(unix second, counter)`.
  last: Mutex<Option<(i64, u32)>>,
}

impl IdGenerator {
  pub fn new() -> Self { Self::default() }

  /// Allocate an id for the current time.
  pub fn generate(&self) -> NodeId { self.generate_at(Utc::now()) }

  /// Allocate an id as if the clock read `now`.
  ///
  /// A clock that has not moved past the last issued second (or went
  /// backwards) continues the counter of that second instead of reusing ids.
  pub fn generate_at(&self, now: DateTime<Utc>) -> NodeId {
    let second = now.timestamp();

    let (second, counter) = {
      let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
      let next = match *last {
        Some((prev, n)) if second <= prev => (prev, n + 1),
        _ => (second, 0),
      };
      *last = Some(next);
      next
    };

    let base = DateTime::from_timestamp(second, 0)
      .unwrap_or(now)
      .format(ID_FORMAT);

    if counter == 0 {
      NodeId::new(base.to_string())
    } else {
      NodeId::new(format!("{base}-{counter}"))
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{collections::HashSet, sync::Arc, thread};

  use chrono::{Duration, TimeZone};

  use super::*;

  fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, h, m, s).unwrap()
  }

  #[test]
  fn first_id_is_the_formatted_second() {
    let ids = IdGenerator::new();
    assert_eq!(ids.generate_at(at(14, 5, 9)).as_str(), "20240309-140509");
  }

  #[test]
  fn same_second_gets_increasing_suffix() {
    let ids = IdGenerator::new();
    let now = at(14, 5, 9);
    let sub = now + Duration::milliseconds(300);

    assert_eq!(ids.generate_at(now).as_str(), "20240309-140509");
    assert_eq!(ids.generate_at(sub).as_str(), "20240309-140509-1");
    assert_eq!(ids.generate_at(now).as_str(), "20240309-140509-2");
  }

  #[test]
  fn suffix_resets_on_new_second() {
    let ids = IdGenerator::new();
    ids.generate_at(at(14, 5, 9));
    ids.generate_at(at(14, 5, 9));
    assert_eq!(ids.generate_at(at(14, 5, 10)).as_str(), "20240309-140510");
  }

  #[test]
  fn later_seconds_sort_after_earlier_ones() {
    let ids = IdGenerator::new();
    let a = ids.generate_at(at(14, 5, 9));
    let b = ids.generate_at(at(14, 5, 9));
    let c = ids.generate_at(at(14, 5, 10));
    assert!(a < b);
    assert!(b < c);
  }

  #[test]
  fn clock_going_backwards_never_repeats() {
    let ids = IdGenerator::new();
    let first = ids.generate_at(at(14, 5, 10));
    let second = ids.generate_at(at(14, 5, 9));
    assert_ne!(first, second);
    assert_eq!(second.as_str(), "20240309-140510-1");
  }

  #[test]
  fn generators_are_independent() {
    let a = IdGenerator::new();
    let b = IdGenerator::new();
    let now = at(1, 2, 3);
    assert_eq!(a.generate_at(now), b.generate_at(now));
  }

  #[test]
  fn concurrent_callers_get_distinct_ids() {
    let ids = Arc::new(IdGenerator::new());
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let ids = Arc::clone(&ids);
        thread::spawn(move || (0..200).map(|_| ids.generate()).collect::<Vec<_>>())
      })
      .collect();

    let mut seen = HashSet::new();
    for handle in handles {
      for id in handle.join().unwrap() {
        assert!(seen.insert(id), "duplicate id");
      }
    }
    assert_eq!(seen.len(), 1600);
  }
}
