/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Request budget tracking.
//!
//! The provider enforces a per-day request cap and, on some plans, a per-month
//! cap. [`QuotaGovernor`] counts one unit per outbound call (not per card) and
//! refuses calls once either budget is spent. Day and month rollover are
//! detected lazily against the injected clock on every access.

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tcg_core::clock::{first_of_next_month, month_key, next_local_midnight};
use tcg_core::Clock;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct QuotaState {
  day: NaiveDate,
  used_today: u32,
  month: (i32, u32),
  used_this_month: u32,
}

/// Point-in-time view of the quota, for status reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaSnapshot {
  pub daily_limit: u32,
  pub used_today: u32,
  pub monthly_limit: Option<u32>,
  pub used_this_month: u32,
  pub remaining: u32,
  pub resets_at: DateTime<Local>,
}

#[derive(Debug)]
pub struct QuotaGovernor {
  daily_limit: u32,
  monthly_limit: Option<u32>,
  clock: Arc<dyn Clock>,
  state: Mutex<QuotaState>,
}

impl QuotaGovernor {
  pub fn new(daily_limit: u32, monthly_limit: Option<u32>, clock: Arc<dyn Clock>) -> Self {
    let now = clock.now();
    let state = QuotaState {
      day: now.date_naive(),
      used_today: 0,
      month: month_key(now),
      used_this_month: 0,
    };
    Self { daily_limit, monthly_limit, clock, state: Mutex::new(state) }
  }

  /// Take one unit of budget. Returns false, without counting, when a cap is reached.
  pub fn try_reserve(&self) -> bool {
    let mut state = self.current();
    if state.used_today >= self.daily_limit {
      return false;
    }
    if let Some(monthly) = self.monthly_limit {
      if state.used_this_month >= monthly {
        return false;
      }
    }
    state.used_today += 1;
    state.used_this_month += 1;
    debug!("quota reserved: {}/{} today", state.used_today, self.daily_limit);
    true
  }

  /// Calls still permitted before the binding cap resets
  pub fn remaining(&self) -> u32 {
    let state = self.current();
    self.remaining_for(&state)
  }

  /// When the binding cap next resets: local midnight, or the first of next
  /// month if the monthly budget is what is exhausted.
  pub fn reset_time(&self) -> DateTime<Local> {
    let now = self.clock.now();
    let state = self.current();
    match self.monthly_limit {
      Some(monthly) if state.used_this_month >= monthly => first_of_next_month(now),
      _ => next_local_midnight(now),
    }
  }

  pub fn daily_limit(&self) -> u32 {
    self.daily_limit
  }

  pub fn monthly_limit(&self) -> Option<u32> {
    self.monthly_limit
  }

  /// Align counters with usage the provider reported; the provider's view wins.
  /// Counters never exceed the cap.
  pub fn sync_remaining(&self, daily_remaining: Option<u32>, monthly_remaining: Option<u32>) {
    let mut state = self.current();
    if let Some(remaining) = daily_remaining {
      let used = self.daily_limit.saturating_sub(remaining);
      if used != state.used_today {
        info!("quota synced from provider: {} used today (was {})", used, state.used_today);
      }
      state.used_today = used;
    }
    if let (Some(limit), Some(remaining)) = (self.monthly_limit, monthly_remaining) {
      state.used_this_month = limit.saturating_sub(remaining);
    }
  }

  pub fn snapshot(&self) -> QuotaSnapshot {
    let (used_today, used_this_month, remaining) = {
      let state = self.current();
      (state.used_today, state.used_this_month, self.remaining_for(&state))
    };
    QuotaSnapshot {
      daily_limit: self.daily_limit,
      used_today,
      monthly_limit: self.monthly_limit,
      used_this_month,
      remaining,
      resets_at: self.reset_time(),
    }
  }

  fn remaining_for(&self, state: &QuotaState) -> u32 {
    let daily = self.daily_limit.saturating_sub(state.used_today);
    match self.monthly_limit {
      Some(monthly) => daily.min(monthly.saturating_sub(state.used_this_month)),
      None => daily,
    }
  }

  /// Lock the state, rolling the day/month windows forward first
  fn current(&self) -> MutexGuard<'_, QuotaState> {
    let now = self.clock.now();
    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

    let today = now.date_naive();
    if today != state.day {
      if state.used_today > 0 {
        info!("quota day rollover: {} requests used on {}", state.used_today, state.day);
      }
      state.day = today;
      state.used_today = 0;
    }

    let month = month_key(now);
    if month != state.month {
      state.month = month;
      state.used_this_month = 0;
    }

    state
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;
  use tcg_core::ManualClock;

  fn governor(daily: u32, monthly: Option<u32>) -> (QuotaGovernor, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at(2025, 5, 14, 10, 0));
    (QuotaGovernor::new(daily, monthly, clock.clone()), clock)
  }

  #[test]
  fn test_cap_is_enforced_at_the_gate() {
    let (quota, _) = governor(3, None);
    assert!(quota.try_reserve());
    assert!(quota.try_reserve());
    assert!(quota.try_reserve());
    assert!(!quota.try_reserve());
    assert_eq!(quota.remaining(), 0);
    assert_eq!(quota.snapshot().used_today, 3);
  }

  #[test]
  fn test_concurrent_reserves_never_exceed_cap() {
    let (quota, _) = governor(25, Some(1000));
    let quota = Arc::new(quota);
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let quota = Arc::clone(&quota);
        std::thread::spawn(move || (0..10).filter(|_| quota.try_reserve()).count())
      })
      .collect();

    let granted: usize = handles.into_iter().map(|handle| handle.join().unwrap()).sum();
    let snapshot = quota.snapshot();
    assert_eq!(granted, 25);
    assert_eq!(snapshot.used_today, 25);
    assert_eq!(snapshot.used_this_month, 25);
    assert_eq!(snapshot.remaining, 0);
  }

  #[test]
  fn test_day_rollover_restores_budget() {
    let (quota, clock) = governor(2, None);
    assert!(quota.try_reserve());
    assert!(quota.try_reserve());
    assert_eq!(quota.remaining(), 0);

    clock.advance(Duration::hours(15));
    assert_eq!(quota.remaining(), 2);
    assert!(quota.try_reserve());
  }

  #[test]
  fn test_reset_time_is_next_local_midnight() {
    let (quota, clock) = governor(5, None);
    let reset = quota.reset_time();
    assert_eq!(reset.date_naive(), clock.now().date_naive().succ_opt().unwrap());
  }

  #[test]
  fn test_monthly_cap_binds_across_days() {
    let (quota, clock) = governor(10, Some(3));
    for _ in 0..3 {
      assert!(quota.try_reserve());
      clock.advance(Duration::days(1));
    }
    assert!(!quota.try_reserve());
    assert_eq!(quota.remaining(), 0);
    assert_eq!(quota.reset_time().date_naive(), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());

    clock.set(ManualClock::at(2025, 6, 1, 8, 0).now());
    assert_eq!(quota.remaining(), 3);
  }

  #[test]
  fn test_sync_remaining_from_provider() {
    let (quota, _) = governor(100, Some(1000));
    quota.sync_remaining(Some(40), Some(900));
    let snap = quota.snapshot();
    assert_eq!(snap.used_today, 60);
    assert_eq!(snap.used_this_month, 100);
    assert_eq!(snap.remaining, 40);

    // more remaining than our cap knows about never goes negative
    quota.sync_remaining(Some(500), None);
    assert_eq!(quota.snapshot().used_today, 0);
  }

  #[test]
  fn test_zero_cap_never_admits() {
    let (quota, _) = governor(0, None);
    assert!(!quota.try_reserve());
    assert_eq!(quota.remaining(), 0);
  }
}
