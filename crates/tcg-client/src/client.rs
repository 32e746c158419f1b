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

use crate::admission::RequestGovernor;
use crate::endpoints::{
  cards::{CardEndpoints, PriceMap},
  sets::{SetEndpoints, SetPage},
  EndpointCore,
};
use crate::quota::QuotaGovernor;
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tcg_core::{Clock, Config, LookupRequest, PriceEntry, Result};
use tokio_util::sync::CancellationToken;

/// Pricing provider client
///
/// Every call goes through one shared `RequestGovernor`, so the rate spacing
/// and the daily/monthly budget hold across card lookups and set listings.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tcg_client::PriceClient;
/// use tcg_core::{Config, SystemClock};
///
/// let config = Config::from_env().expect("Missing configuration");
/// let client = PriceClient::new(config, Arc::new(SystemClock)).expect("Failed to create client");
/// println!("{} calls left today", client.quota().remaining());
/// ```
pub struct PriceClient {
  core: EndpointCore,
  max_batch_size: usize,
  page_size: usize,
}

impl PriceClient {
  /// Create a new client with its own quota counters
  ///
  /// # Errors
  ///
  /// Returns an error if the config is invalid or the HTTP client cannot be created.
  pub fn new(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
    let quota = Arc::new(QuotaGovernor::new(config.daily_limit, config.monthly_limit, clock));
    Self::with_quota(config, quota)
  }

  /// Create a client that shares an existing quota governor
  pub fn with_quota(config: Config, quota: Arc<QuotaGovernor>) -> Result<Self> {
    config.validate()?;

    let transport = Arc::new(Transport::new(&config)?);
    let governor = Arc::new(RequestGovernor::from_parts(
      quota,
      config.rate_limit,
      Duration::from_secs(config.rate_wait_secs),
    ));

    Ok(Self {
      core: EndpointCore::new(transport, governor),
      max_batch_size: config.max_batch_size,
      page_size: config.set_page_size,
    })
  }

  /// Get access to card price endpoints
  pub fn cards(&self) -> CardEndpoints {
    CardEndpoints::new(self.core.clone(), self.max_batch_size)
  }

  /// Get access to set listing endpoints
  pub fn sets(&self) -> SetEndpoints {
    SetEndpoints::new(self.core.clone())
  }

  pub fn quota(&self) -> &Arc<QuotaGovernor> {
    self.core.governor.quota()
  }

  pub fn max_batch_size(&self) -> usize {
    self.max_batch_size
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  /// See [`CardEndpoints::fetch_by_identifiers`]
  pub async fn fetch_by_identifiers(
    &self,
    batch: &[LookupRequest],
    cancel: &CancellationToken,
  ) -> Result<PriceMap> {
    self.cards().fetch_by_identifiers(batch, cancel).await
  }

  /// See [`CardEndpoints::fetch_by_search`]
  pub async fn fetch_by_search(
    &self,
    lookup: &LookupRequest,
    cancel: &CancellationToken,
  ) -> Result<Vec<PriceEntry>> {
    self.cards().fetch_by_search(lookup, cancel).await
  }

  /// See [`SetEndpoints::fetch_set_page`]
  pub async fn fetch_set_page(
    &self,
    set_key: &str,
    offset: usize,
    cancel: &CancellationToken,
  ) -> Result<SetPage> {
    self.sets().fetch_set_page(set_key, offset, self.page_size, cancel).await
  }
}
