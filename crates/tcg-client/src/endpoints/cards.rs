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

use super::{impl_endpoint_base, EndpointBase, EndpointCore};
use crate::admission::RequestGovernor;
use crate::normalize::variants_to_prices;
use crate::transport::Transport;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tcg_core::{Error, LookupRequest, PriceEntry, Result};
use tcg_models::{CardBatchItem, ProviderCard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Prices keyed by the caller's card id
pub type PriceMap = HashMap<String, Vec<PriceEntry>>;

/// Card price lookup endpoints
pub struct CardEndpoints {
  transport: Arc<Transport>,
  governor: Arc<RequestGovernor>,
  max_batch_size: usize,
}

impl CardEndpoints {
  /// Create a new card endpoints instance
  pub fn new(core: EndpointCore, max_batch_size: usize) -> Self {
    Self { transport: core.transport, governor: core.governor, max_batch_size }
  }

  /// Fetch prices for a batch of cards in one call, using one unit of quota
  ///
  /// Only lookups that carry a provider id or an alternate id take part;
  /// the rest are skipped with a log line. Results are matched back to the
  /// caller's card ids by identifier, never by response position, because
  /// the provider drops unknown items and may reorder the rest.
  ///
  /// # Arguments
  ///
  /// * `batch` - Lookups to price, at most the configured batch max
  /// * `cancel` - Aborts the wait for a rate slot; an in-flight request is not cancelled
  ///
  /// # Errors
  ///
  /// `Error::BatchTooLarge` before any quota is spent when `batch` exceeds the max.
  ///
  /// # Examples
  ///
  /// ```rust,no_run
  /// # use tcg_client::PriceClient;
  /// # use tcg_core::LookupRequest;
  /// # use tokio_util::sync::CancellationToken;
  /// # async fn run(client: PriceClient, lookups: Vec<LookupRequest>) -> tcg_core::Result<()> {
  /// let prices = client.cards().fetch_by_identifiers(&lookups, &CancellationToken::new()).await?;
  /// for (card_id, entries) in prices {
  ///     println!("{}: {} prices", card_id, entries.len());
  /// }
  /// # Ok(())
  /// # }
  /// ```
  #[instrument(skip(self, batch, cancel), fields(batch_size = batch.len()))]
  pub async fn fetch_by_identifiers(
    &self,
    batch: &[LookupRequest],
    cancel: &CancellationToken,
  ) -> Result<PriceMap> {
    if batch.len() > self.max_batch_size {
      return Err(Error::BatchTooLarge { size: batch.len(), max: self.max_batch_size });
    }

    let usable: Vec<&LookupRequest> = batch
      .iter()
      .filter(|lookup| {
        if !lookup.has_identifier() {
          warn!("skipping card {} in batch: no provider identifier", lookup.card_id);
        }
        lookup.has_identifier()
      })
      .collect();

    if usable.is_empty() {
      debug!("no lookups with identifiers, nothing to fetch");
      return Ok(PriceMap::new());
    }

    self.admit(cancel).await?;

    let body: Vec<CardBatchItem> = usable
      .iter()
      .map(|lookup| CardBatchItem {
        tcgplayer_id: lookup.provider_id.clone(),
        scryfall_id: if lookup.provider_id.is_none() { lookup.alternate_id.clone() } else { None },
        game: Some(lookup.game.provider_slug().to_string()),
      })
      .collect();

    let params = [("include_price_history", "false".to_string())];
    let response = self
      .transport()
      .post::<_, Vec<ProviderCard>>("cards", &params, &body, self.transport.timeout())
      .await?;

    self.governor.absorb_usage(response.usage.as_ref());

    let cards = response.data.unwrap_or_default();
    let returned = cards.len();
    let prices = reconcile(&usable, cards);

    info!(
      "batch lookup: {} requested, {} returned, {} cards with prices (quota remaining: {})",
      usable.len(),
      returned,
      prices.len(),
      self.governor.quota().remaining()
    );

    Ok(prices)
  }

  /// Look up a single card by name and set key, using one unit of quota
  ///
  /// Used when no identifier is known. The first result is taken as the card;
  /// its prices are keyed to `lookup.card_id`.
  #[instrument(skip(self, lookup, cancel), fields(card_id = %lookup.card_id))]
  pub async fn fetch_by_search(
    &self,
    lookup: &LookupRequest,
    cancel: &CancellationToken,
  ) -> Result<Vec<PriceEntry>> {
    self.admit(cancel).await?;

    let mut params = vec![
      ("q", lookup.name.clone()),
      ("game", lookup.game.provider_slug().to_string()),
      ("include_price_history", "false".to_string()),
    ];
    if let Some(set_key) = &lookup.set_key {
      params.push(("set", set_key.clone()));
    }

    let response =
      self.transport().get::<Vec<ProviderCard>>("cards", &params, self.transport.timeout()).await?;
    self.governor.absorb_usage(response.usage.as_ref());

    let prices = response
      .data
      .unwrap_or_default()
      .into_iter()
      .next()
      .map(|card| variants_to_prices(&lookup.card_id, &card.variants, Utc::now()))
      .unwrap_or_default();

    debug!("search lookup for {:?} returned {} prices", lookup.name, prices.len());
    Ok(prices)
  }
}

impl_endpoint_base!(CardEndpoints);

/// Match returned cards to requested lookups by provider id, then alternate id.
///
/// Several lookups may share an identifier (duplicate collection rows); each
/// of them receives the prices. Returned cards nobody asked for are ignored,
/// and cards without a usable price are left out of the map.
pub fn reconcile(requested: &[&LookupRequest], cards: Vec<ProviderCard>) -> PriceMap {
  let mut by_provider: HashMap<&str, Vec<&str>> = HashMap::new();
  let mut by_alternate: HashMap<&str, Vec<&str>> = HashMap::new();

  for lookup in requested {
    if let Some(id) = lookup.provider_id.as_deref() {
      by_provider.entry(id).or_default().push(&lookup.card_id);
    }
    if let Some(id) = lookup.alternate_id.as_deref() {
      by_alternate.entry(id).or_default().push(&lookup.card_id);
    }
  }

  let fetched_at = Utc::now();
  let mut out = PriceMap::new();

  for card in cards {
    let owners = card
      .tcgplayer_id
      .as_deref()
      .and_then(|id| by_provider.get(id))
      .or_else(|| card.scryfall_id.as_deref().and_then(|id| by_alternate.get(id)));

    let Some(owners) = owners else {
      debug!("ignoring unrequested card {:?} ({:?})", card.name, card.tcgplayer_id);
      continue;
    };

    for card_id in owners {
      let prices = variants_to_prices(card_id, &card.variants, fetched_at);
      if !prices.is_empty() {
        out.entry((*card_id).to_string()).or_insert_with(Vec::new).extend(prices);
      }
    }
  }

  out
}
