//! The seam between the engine and the pricing provider.

use async_trait::async_trait;
use std::sync::Arc;
use tcg_client::{PriceClient, PriceMap, QuotaGovernor, SetPage};
use tcg_core::{LookupRequest, PriceEntry, Result};
use tokio_util::sync::CancellationToken;

/// Everything the scheduler and set sync need from a pricing provider.
///
/// Each fetch spends one unit of the shared quota. Implementations do not
/// retry; the scheduler decides what happens after a failure.
#[async_trait]
pub trait PriceProvider: Send + Sync {
  /// Batched lookup keyed back to the caller's card ids
  async fn fetch_by_identifiers(
    &self,
    batch: &[LookupRequest],
    cancel: &CancellationToken,
  ) -> Result<PriceMap>;

  /// Single lookup by name and set, for cards without any identifier
  async fn fetch_by_search(
    &self,
    lookup: &LookupRequest,
    cancel: &CancellationToken,
  ) -> Result<Vec<PriceEntry>>;

  /// One page of a provider set listing
  async fn fetch_set_page(
    &self,
    set_key: &str,
    offset: usize,
    cancel: &CancellationToken,
  ) -> Result<SetPage>;

  fn quota(&self) -> Arc<QuotaGovernor>;

  fn max_batch_size(&self) -> usize;
}

#[async_trait]
impl PriceProvider for PriceClient {
  async fn fetch_by_identifiers(
    &self,
    batch: &[LookupRequest],
    cancel: &CancellationToken,
  ) -> Result<PriceMap> {
    PriceClient::fetch_by_identifiers(self, batch, cancel).await
  }

  async fn fetch_by_search(
    &self,
    lookup: &LookupRequest,
    cancel: &CancellationToken,
  ) -> Result<Vec<PriceEntry>> {
    PriceClient::fetch_by_search(self, lookup, cancel).await
  }

  async fn fetch_set_page(
    &self,
    set_key: &str,
    offset: usize,
    cancel: &CancellationToken,
  ) -> Result<SetPage> {
    PriceClient::fetch_set_page(self, set_key, offset, cancel).await
  }

  fn quota(&self) -> Arc<QuotaGovernor> {
    Arc::clone(PriceClient::quota(self))
  }

  fn max_batch_size(&self) -> usize {
    PriceClient::max_batch_size(self)
  }
}
