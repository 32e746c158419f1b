//! Wall clock abstraction.
//!
//! Quota windows and the "updated today" counter roll over on the local
//! calendar, so anything that tracks them takes a [`Clock`] instead of
//! calling `Local::now()` directly. Tests drive a [`ManualClock`].

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

pub trait Clock: Send + Sync + Debug {
  fn now(&self) -> DateTime<Local>;

  fn now_utc(&self) -> DateTime<Utc> {
    self.now().with_timezone(&Utc)
  }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Local> {
    Local::now()
  }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
  now: Mutex<DateTime<Local>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Local>) -> Self {
    Self { now: Mutex::new(start) }
  }

  /// Build a clock at a local wall time; ambiguous DST instants take the earlier reading
  pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
    let naive = NaiveDate::from_ymd_opt(year, month, day)
      .and_then(|d| d.and_hms_opt(hour, minute, 0))
      .unwrap_or_default();
    Self::new(local_from_naive(naive))
  }

  pub fn set(&self, to: DateTime<Local>) {
    *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
  }

  pub fn advance(&self, by: Duration) {
    let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
    *now += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Local> {
    *self.now.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Start of the next local calendar day after `now`
pub fn next_local_midnight(now: DateTime<Local>) -> DateTime<Local> {
  match now.date_naive().succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0)) {
    Some(naive) => local_from_naive(naive),
    None => now + Duration::days(1),
  }
}

/// Midnight on the first day of the month after `now`
pub fn first_of_next_month(now: DateTime<Local>) -> DateTime<Local> {
  let (year, month) =
    if now.month() == 12 { (now.year() + 1, 1) } else { (now.year(), now.month() + 1) };

  match NaiveDate::from_ymd_opt(year, month, 1).and_then(|d| d.and_hms_opt(0, 0, 0)) {
    Some(naive) => local_from_naive(naive),
    None => next_local_midnight(now),
  }
}

/// Year and month of a local timestamp, used as the monthly window key
pub fn month_key(at: DateTime<Local>) -> (i32, u32) {
  (at.year(), at.month())
}

fn local_from_naive(naive: NaiveDateTime) -> DateTime<Local> {
  // midnight can fall inside a DST gap in a few zones
  Local.from_local_datetime(&naive).earliest().unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Timelike;

  #[test]
  fn test_manual_clock_advances() {
    let clock = ManualClock::at(2025, 3, 10, 12, 0);
    let start = clock.now();
    clock.advance(Duration::hours(3));
    assert_eq!(clock.now() - start, Duration::hours(3));
  }

  #[test]
  fn test_next_local_midnight() {
    let clock = ManualClock::at(2025, 6, 15, 18, 30);
    let midnight = next_local_midnight(clock.now());
    assert_eq!(midnight.date_naive(), NaiveDate::from_ymd_opt(2025, 6, 16).unwrap());
    assert_eq!(midnight.hour(), 0);
    assert_eq!(midnight.minute(), 0);
  }

  #[test]
  fn test_first_of_next_month_wraps_year() {
    let clock = ManualClock::at(2025, 12, 20, 9, 0);
    let reset = first_of_next_month(clock.now());
    assert_eq!(reset.date_naive(), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
  }

  #[test]
  fn test_month_key() {
    let clock = ManualClock::at(2025, 2, 28, 23, 0);
    assert_eq!(month_key(clock.now()), (2025, 2));
  }
}
