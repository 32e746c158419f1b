//! Gate every outbound call through rate spacing and the request budget.

use std::sync::Arc;
use std::time::Duration;
use tcg_core::{Error, Result};
use tcg_models::UsageMetadata;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::quota::QuotaGovernor;
use crate::rate::RateGate;

#[derive(Debug)]
pub struct RequestGovernor {
  quota: Arc<QuotaGovernor>,
  rate: RateGate,
}

impl RequestGovernor {
  pub fn new(quota: Arc<QuotaGovernor>, rate: RateGate) -> Self {
    Self { quota, rate }
  }

  pub fn from_parts(
    quota: Arc<QuotaGovernor>,
    requests_per_minute: u32,
    max_wait: Duration,
  ) -> Self {
    Self::new(quota, RateGate::per_minute(requests_per_minute, max_wait))
  }

  /// Wait for a rate slot, then take one unit of quota.
  ///
  /// An empty budget fails before waiting so callers do not sit on the
  /// limiter for a call that cannot be made anyway.
  pub async fn admit(&self, cancel: &CancellationToken) -> Result<()> {
    if self.quota.remaining() == 0 {
      return Err(Error::QuotaExhausted { resets_at: self.quota.reset_time() });
    }

    self.rate.acquire(cancel).await?;

    if !self.quota.try_reserve() {
      warn!("quota exhausted while waiting for a rate slot");
      return Err(Error::QuotaExhausted { resets_at: self.quota.reset_time() });
    }
    Ok(())
  }

  /// Fold provider-reported usage into the local counters
  pub fn absorb_usage(&self, usage: Option<&UsageMetadata>) {
    if let Some(usage) = usage {
      self.quota.sync_remaining(usage.daily_remaining(), usage.monthly_remaining());
    }
  }

  pub fn quota(&self) -> &Arc<QuotaGovernor> {
    &self.quota
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tcg_core::ManualClock;

  fn governor(daily: u32) -> RequestGovernor {
    let clock = Arc::new(ManualClock::at(2025, 1, 15, 9, 0));
    let quota = Arc::new(QuotaGovernor::new(daily, None, clock));
    RequestGovernor::from_parts(quota, 60_000, Duration::from_secs(1))
  }

  #[tokio::test]
  async fn test_admit_consumes_quota() {
    let gov = governor(2);
    let cancel = CancellationToken::new();
    gov.admit(&cancel).await.unwrap();
    assert_eq!(gov.quota().remaining(), 1);
  }

  #[tokio::test]
  async fn test_admit_refuses_when_budget_spent() {
    let gov = governor(1);
    let cancel = CancellationToken::new();
    gov.admit(&cancel).await.unwrap();

    let err = gov.admit(&cancel).await.unwrap_err();
    assert!(matches!(err, Error::QuotaExhausted { .. }));
  }

  #[test]
  fn test_absorb_usage() {
    let gov = governor(100);
    let usage = UsageMetadata { api_daily_requests_remaining: Some(95), ..Default::default() };
    gov.absorb_usage(Some(&usage));
    assert_eq!(gov.quota().remaining(), 95);
    gov.absorb_usage(None);
    assert_eq!(gov.quota().remaining(), 95);
  }
}
