//! Minimum spacing between outbound calls, independent of the daily budget.

use governor::{
  Quota, RateLimiter,
  clock::DefaultClock,
  middleware::NoOpMiddleware,
  state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::time::Duration;
use tcg_core::{Error, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Token limiter that hands out one slot every `60s / requests_per_minute`
pub struct RateGate {
  limiter: DirectLimiter,
  max_wait: Duration,
  period: Duration,
}

impl RateGate {
  /// Build a gate with burst 1, so calls are evenly spaced rather than bunched
  pub fn per_minute(requests_per_minute: u32, max_wait: Duration) -> Self {
    let rpm = requests_per_minute.max(1);
    let period = Duration::from_millis((60_000 / u64::from(rpm)).max(1));
    let quota = Quota::with_period(period)
      .unwrap_or_else(|| Quota::per_minute(NonZeroU32::new(rpm).unwrap_or(NonZeroU32::MIN)));

    Self { limiter: RateLimiter::direct(quota), max_wait, period }
  }

  /// Block until a slot is free, the wait times out, or `cancel` fires
  pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(Error::Cancelled),
      waited = tokio::time::timeout(self.max_wait, self.limiter.until_ready()) => {
        waited.map_err(|_| Error::RateLimitTimeout(self.max_wait))?;
        debug!("rate slot acquired");
        Ok(())
      }
    }
  }

  pub fn period(&self) -> Duration {
    self.period
  }
}

impl std::fmt::Debug for RateGate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RateGate")
      .field("period", &self.period)
      .field("max_wait", &self.max_wait)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_period_from_rpm() {
    let gate = RateGate::per_minute(10, Duration::from_secs(30));
    assert_eq!(gate.period(), Duration::from_secs(6));

    let gate = RateGate::per_minute(0, Duration::from_secs(30));
    assert_eq!(gate.period(), Duration::from_secs(60));
  }

  #[tokio::test]
  async fn test_first_slot_is_immediate() {
    let gate = RateGate::per_minute(1, Duration::from_millis(200));
    let cancel = CancellationToken::new();
    assert!(gate.acquire(&cancel).await.is_ok());
  }

  #[tokio::test]
  async fn test_second_slot_times_out() {
    let gate = RateGate::per_minute(1, Duration::from_millis(50));
    let cancel = CancellationToken::new();
    gate.acquire(&cancel).await.unwrap();

    let err = gate.acquire(&cancel).await.unwrap_err();
    assert!(matches!(err, Error::RateLimitTimeout(_)));
  }

  #[tokio::test]
  async fn test_cancel_wins_over_wait() {
    let gate = RateGate::per_minute(1, Duration::from_secs(60));
    let cancel = CancellationToken::new();
    gate.acquire(&cancel).await.unwrap();

    cancel.cancel();
    let err = gate.acquire(&cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
  }
}
