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

//! The background price worker.
//!
//! Each cycle passes a quota gate, selects up to one batch of cards (urgent
//! requests, then never-priced cards, then the oldest prices), discovers
//! missing provider identifiers set by set, and prices the whole batch with
//! one provider call.

use crate::cycle_tracker::{CycleCounts, CycleReport, CycleState, CycleTracker};
use crate::error::{ResolveError, SyncError, SyncResult};
use crate::price_cache::{PriceCache, PriceQuote};
use crate::provider::PriceProvider;
use crate::resolver::{Resolver, SetIdentifierIndex};
use crate::set_mapping::SetKeyTranslator;
use crate::unmatched::{UnmatchedCard, UnmatchedReason, UnmatchedRegistry};
use crate::urgent_queue::UrgentQueue;
use crate::{BATCH_QUOTA_RESERVE, MIN_SET_SYNC_QUOTA};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tcg_client::PriceMap;
use tcg_core::{CardRef, Clock, Condition, ErrorKind, LookupRequest, PriceEntry, Printing};
use tcg_database_postgres::{CardRepository, PriceRepository};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
  /// Time between cycles
  pub interval: Duration,
  /// Cards per cycle, at most the provider's batch max
  pub batch_size: usize,
  /// Age after which a cached price is reported stale
  pub stale_after: chrono::Duration,
  /// Cycle reports kept for status
  pub history: usize,
}

impl Default for WorkerConfig {
  fn default() -> Self {
    Self {
      interval: Duration::from_secs(15 * 60),
      batch_size: tcg_core::DEFAULT_MAX_BATCH_SIZE,
      stale_after: chrono::Duration::hours(24),
      history: 48,
    }
  }
}

/// Snapshot of the worker for status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
  pub last_update_time: Option<DateTime<Utc>>,
  pub next_update_time: Option<DateTime<Utc>>,
  pub cards_updated_today: usize,
  pub batch_size: usize,
  pub queue_size: usize,
  pub daily_limit: u32,
  pub remaining: u32,
  pub resets_at: DateTime<Local>,
  pub monthly_limit: Option<u32>,
  pub used_this_month: u32,
  pub unmatched_cards: Vec<UnmatchedCard>,
  pub last_cycle: Option<CycleReport>,
}

#[derive(Debug)]
struct DailyStats {
  day: NaiveDate,
  cards_updated_today: usize,
  last_run: Option<DateTime<Utc>>,
}

enum CycleOutcome {
  Skipped,
  Completed,
  Interrupted(String),
}

pub struct PriceWorker {
  provider: Arc<dyn PriceProvider>,
  cards: Arc<dyn CardRepository>,
  cache: Arc<PriceCache>,
  resolver: Resolver,
  queue: UrgentQueue,
  unmatched: Arc<UnmatchedRegistry>,
  tracker: CycleTracker,
  clock: Arc<dyn Clock>,
  config: WorkerConfig,
  stats: RwLock<DailyStats>,
  cycle_lock: tokio::sync::Mutex<()>,
}

impl PriceWorker {
  pub fn new(
    provider: Arc<dyn PriceProvider>,
    cards: Arc<dyn CardRepository>,
    prices: Arc<dyn PriceRepository>,
    translator: Arc<dyn SetKeyTranslator>,
    clock: Arc<dyn Clock>,
    mut config: WorkerConfig,
  ) -> Self {
    let max = provider.max_batch_size().max(1);
    if config.batch_size == 0 || config.batch_size > max {
      warn!("worker batch size {} out of range, using {}", config.batch_size, max);
      config.batch_size = config.batch_size.clamp(1, max);
    }

    let cache =
      Arc::new(PriceCache::new(prices, Arc::clone(&cards), Arc::clone(&clock), config.stale_after));
    let stats =
      DailyStats { day: clock.now().date_naive(), cards_updated_today: 0, last_run: None };

    Self {
      resolver: Resolver::new(Arc::clone(&provider), translator),
      provider,
      cards,
      cache,
      queue: UrgentQueue::new(),
      unmatched: Arc::new(UnmatchedRegistry::new()),
      tracker: CycleTracker::new(config.history),
      clock,
      config,
      stats: RwLock::new(stats),
      cycle_lock: tokio::sync::Mutex::new(()),
    }
  }

  pub fn config(&self) -> &WorkerConfig {
    &self.config
  }

  pub fn cache(&self) -> &Arc<PriceCache> {
    &self.cache
  }

  /// Registry shared with admin set sync
  pub fn unmatched(&self) -> &Arc<UnmatchedRegistry> {
    &self.unmatched
  }

  /// Run a cycle now, then one per interval, until `cancel` fires.
  /// Cancellation is checked between cycles and during set pagination.
  pub async fn run(&self, cancel: CancellationToken) {
    info!(
      "price worker started: every {:?}, batch size {}",
      self.config.interval, self.config.batch_size
    );

    let mut ticker = tokio::time::interval(self.config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        _ = cancel.cancelled() => break,
        _ = ticker.tick() => {
          self.run_cycle(&cancel).await;
        }
      }
    }

    info!("price worker stopped");
  }

  /// One full cycle. Errors are contained and reported in the returned report.
  pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleReport {
    let _running = self.cycle_lock.lock().await;
    self.roll_daily_stats();

    let quota = self.provider.quota();
    let used_before = quota.snapshot().used_today;
    let started = self.clock.now_utc();
    self.tracker.start(started).await;

    let mut counts = CycleCounts::default();
    let outcome = self.cycle_body(cancel, &mut counts).await;
    counts.requests_used = quota.snapshot().used_today.saturating_sub(used_before);

    let (state, message) = match outcome {
      Ok(CycleOutcome::Skipped) => (CycleState::Skipped, None),
      Ok(CycleOutcome::Completed) => (CycleState::Success, None),
      Ok(CycleOutcome::Interrupted(reason)) => (CycleState::CompletedWithErrors, Some(reason)),
      Err(e) => (CycleState::Failed, Some(e.to_string())),
    };

    let finished = self.clock.now_utc();
    {
      let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
      stats.cards_updated_today += counts.cards_updated;
      stats.last_run = Some(finished);
    }

    info!(
      "price cycle {:?}: {} selected ({} urgent, {} unpriced, {} oldest), {} sets synced, \
       {} ids found, {} unmatched, {} deferred, {} updated, {} requests, {} remaining",
      state,
      counts.selected,
      counts.urgent,
      counts.without_price,
      counts.oldest_priced,
      counts.sets_synced,
      counts.ids_discovered,
      counts.newly_unmatched,
      counts.deferred,
      counts.cards_updated,
      counts.requests_used,
      quota.remaining()
    );

    let fallback = CycleReport {
      start_time: started,
      end_time: Some(finished),
      state,
      counts: counts.clone(),
      error_message: message.clone(),
    };
    self.tracker.complete(state, counts, message, finished).await.unwrap_or(fallback)
  }

  async fn cycle_body(
    &self,
    cancel: &CancellationToken,
    counts: &mut CycleCounts,
  ) -> SyncResult<CycleOutcome> {
    let quota = self.provider.quota();
    if quota.remaining() == 0 {
      info!("request quota exhausted, skipping cycle until {}", quota.reset_time());
      return Ok(CycleOutcome::Skipped);
    }

    let mut cards = self.select_candidates(counts).await?;
    counts.selected = cards.len();
    if cards.is_empty() {
      debug!("no cards need price updates");
      return Ok(CycleOutcome::Completed);
    }

    self.discover_identifiers(&mut cards, cancel, counts).await;

    let lookups: Vec<LookupRequest> =
      cards.iter().filter(|c| c.has_lookup_identifier()).map(LookupRequest::from_card).collect();
    if lookups.is_empty() {
      debug!("no selected card has an identifier yet");
      return Ok(CycleOutcome::Completed);
    }
    if cancel.is_cancelled() {
      return Ok(CycleOutcome::Interrupted("cancelled before batch fetch".to_string()));
    }

    match self.provider.fetch_by_identifiers(&lookups, cancel).await {
      Ok(prices) => {
        self.store_prices(&mut cards, prices, counts).await;
        Ok(CycleOutcome::Completed)
      }
      Err(e) => match e.kind() {
        ErrorKind::QuotaExhausted => {
          info!("quota spent before batch fetch, deferring {} cards: {}", lookups.len(), e);
          counts.deferred += lookups.len();
          Ok(CycleOutcome::Skipped)
        }
        ErrorKind::Cancelled => {
          counts.deferred += lookups.len();
          Ok(CycleOutcome::Interrupted("cancelled before batch fetch".to_string()))
        }
        ErrorKind::ProviderRejected => {
          error!("batch rejected, abandoning cycle: {}", e);
          Err(SyncError::from_api(e))
        }
        _ => {
          warn!("batch fetch failed, retrying next cycle: {}", e);
          Err(SyncError::from_api(e))
        }
      },
    }
  }

  /// Urgent ids first, then cards with no cached price, then the oldest prices
  async fn select_candidates(&self, counts: &mut CycleCounts) -> SyncResult<Vec<CardRef>> {
    let batch = self.config.batch_size;
    let mut selected: Vec<CardRef> = Vec::with_capacity(batch);

    let urgent_ids = self.queue.drain(batch);
    if !urgent_ids.is_empty() {
      match self.cards.find_by_ids(&urgent_ids).await {
        Ok(found) => {
          if found.len() < urgent_ids.len() {
            debug!("{} urgent ids did not match a card", urgent_ids.len() - found.len());
          }
          selected.extend(found);
        }
        Err(e) => {
          self.queue.requeue_front(&urgent_ids);
          return Err(e.into());
        }
      }
    }
    counts.urgent = selected.len();

    let mut exclude: Vec<String> = selected.iter().map(|c| c.id.clone()).collect();
    exclude.extend(self.unmatched.ids());

    if selected.len() < batch {
      let unpriced =
        self.cards.collection_cards_without_prices(&exclude, batch - selected.len()).await?;
      counts.without_price = unpriced.len();
      exclude.extend(unpriced.iter().map(|c| c.id.clone()));
      selected.extend(unpriced);
    }

    if selected.len() < batch {
      let oldest =
        self.cards.collection_cards_oldest_priced(&exclude, batch - selected.len()).await?;
      counts.oldest_priced = oldest.len();
      selected.extend(oldest);
    }

    Ok(selected)
  }

  async fn discover_identifiers(
    &self,
    cards: &mut [CardRef],
    cancel: &CancellationToken,
    counts: &mut CycleCounts,
  ) {
    let mut by_set: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, card) in cards.iter().enumerate() {
      if card.game.needs_provider_id()
        && !card.has_provider_id()
        && !self.unmatched.contains(&card.id)
      {
        by_set.entry(card.set_key().to_string()).or_default().push(i);
      }
    }

    let quota = self.provider.quota();
    for (set_name, members) in by_set {
      if cancel.is_cancelled() {
        counts.deferred += members.len();
        continue;
      }
      if quota.remaining() < MIN_SET_SYNC_QUOTA {
        info!("quota too low to sync set {:?}, deferring {} cards", set_name, members.len());
        counts.deferred += members.len();
        continue;
      }

      match self.resolver.resolve_set(&set_name, BATCH_QUOTA_RESERVE, cancel).await {
        Ok(index) => {
          counts.sets_synced += 1;
          self.recheck_unmatched(&set_name, &index).await;
          for i in members {
            self.match_card(&mut cards[i], &index, counts).await;
          }
        }
        Err(e) if e.is_permanent() => {
          warn!("set {:?} has no provider mapping, {} cards unmatched", set_name, members.len());
          for i in members {
            if self.mark_unmatched(&cards[i], UnmatchedReason::UnknownSetMapping) {
              counts.newly_unmatched += 1;
            }
          }
        }
        Err(e) => {
          warn!("set {:?} sync failed, deferring {} cards: {}", set_name, members.len(), e);
          counts.deferred += members.len();
        }
      }
    }
  }

  async fn match_card(
    &self,
    card: &mut CardRef,
    index: &SetIdentifierIndex,
    counts: &mut CycleCounts,
  ) {
    match index.lookup_card(card).map(str::to_string) {
      Some(provider_id) => {
        card.assign_provider_id(&provider_id);
        if let Err(e) = self.cards.set_provider_id(&card.id, &provider_id).await {
          warn!("failed to persist provider id for {}: {}", card.id, e);
        }
        self.unmatched.remove(&card.id);
        counts.ids_discovered += 1;
        debug!("card {} ({} #{}) -> {}", card.id, card.name, card.card_number, provider_id);
      }
      None if index.complete => {
        if self.mark_unmatched(card, UnmatchedReason::NotFoundInSet) {
          counts.newly_unmatched += 1;
        }
      }
      None => counts.deferred += 1,
    }
  }

  /// Registry entries for this set get another look against the fresh index
  async fn recheck_unmatched(&self, set_name: &str, index: &SetIdentifierIndex) {
    for entry in self.unmatched.not_found_in(set_name) {
      let Some(provider_id) = index.lookup(&entry.card_number, &entry.name) else {
        continue;
      };
      match self.cards.set_provider_id(&entry.card_id, provider_id).await {
        Ok(_) => {
          self.unmatched.remove(&entry.card_id);
          info!("previously unmatched card {} resolved to {}", entry.card_id, provider_id);
        }
        Err(e) => warn!("failed to persist provider id for {}: {}", entry.card_id, e),
      }
    }
  }

  fn mark_unmatched(&self, card: &CardRef, reason: UnmatchedReason) -> bool {
    self.unmatched.record(UnmatchedCard {
      card_id: card.id.clone(),
      name: card.name.clone(),
      card_number: card.card_number.clone(),
      set_name: card.set_key().to_string(),
      reason,
      recorded_at: self.clock.now_utc(),
    })
  }

  async fn store_prices(
    &self,
    cards: &mut [CardRef],
    mut prices: PriceMap,
    counts: &mut CycleCounts,
  ) {
    for card in cards.iter_mut() {
      let Some(entries) = prices.remove(&card.id) else {
        continue;
      };
      match self.cache.save(card, &entries).await {
        Ok(0) => debug!("card {} already has newer prices", card.id),
        Ok(_) => counts.cards_updated += 1,
        Err(e) => warn!("failed to save prices for {}: {}", card.id, e),
      }
    }
  }

  /// Refresh one card now, outside the batch schedule.
  ///
  /// Passes the quota gate, resolves the card's set when it has no identifier,
  /// and falls back to a search lookup when no identifier can be found.
  pub async fn refresh_card(
    &self,
    card_id: &str,
    cancel: &CancellationToken,
  ) -> SyncResult<Vec<PriceEntry>> {
    let mut card = self
      .cards
      .find_by_id(card_id)
      .await?
      .ok_or_else(|| SyncError::CardNotFound(card_id.to_string()))?;

    let quota = self.provider.quota();
    if quota.remaining() == 0 {
      return Err(SyncError::QuotaExhausted { resets_at: quota.reset_time() });
    }

    if card.game.needs_provider_id()
      && !card.has_provider_id()
      && quota.remaining() >= MIN_SET_SYNC_QUOTA
    {
      match self.resolver.resolve_set(card.set_key(), BATCH_QUOTA_RESERVE, cancel).await {
        Ok(index) => {
          if let Some(provider_id) = index.lookup_card(&card).map(str::to_string) {
            card.assign_provider_id(&provider_id);
            self.cards.set_provider_id(&card.id, &provider_id).await?;
            self.unmatched.remove(&card.id);
          }
        }
        Err(ResolveError::Cancelled) => return Err(SyncError::Cancelled),
        Err(e) => debug!("set lookup failed for {}, falling back to search: {}", card.id, e),
      }
    }

    let mut lookup = LookupRequest::from_card(&card);
    let prices = if lookup.has_identifier() {
      self
        .provider
        .fetch_by_identifiers(std::slice::from_ref(&lookup), cancel)
        .await
        .map_err(SyncError::from_api)?
        .remove(&card.id)
        .unwrap_or_default()
    } else {
      lookup.set_key = self.resolver.translate(card.set_key());
      self.provider.fetch_by_search(&lookup, cancel).await.map_err(SyncError::from_api)?
    };

    if prices.is_empty() {
      info!("no prices returned for card {}", card.id);
      return Ok(prices);
    }

    if self.cache.save(&mut card, &prices).await? > 0 {
      self.roll_daily_stats();
      self.stats.write().unwrap_or_else(PoisonError::into_inner).cards_updated_today += 1;
    }
    Ok(prices)
  }

  pub async fn get_price(
    &self,
    card_id: &str,
    condition: Condition,
    printing: Printing,
  ) -> Option<PriceQuote> {
    self.cache.get(card_id, condition, printing).await
  }

  pub async fn get_all_prices(&self, card_id: &str) -> Vec<PriceEntry> {
    self.cache.get_all(card_id).await
  }

  /// Queue a card for the next cycle; returns its 1-based position
  pub fn enqueue_urgent_refresh(&self, card_id: &str) -> usize {
    let position = self.queue.enqueue(card_id);
    debug!("card {} queued for urgent refresh at position {}", card_id, position);
    position
  }

  pub fn clear_unmatched(&self, card_id: &str) -> bool {
    self.unmatched.remove(card_id)
  }

  pub fn clear_all_unmatched(&self) -> usize {
    let cleared = self.unmatched.clear();
    info!("cleared {} unmatched cards", cleared);
    cleared
  }

  pub async fn get_status(&self) -> WorkerStatus {
    self.roll_daily_stats();
    let (last_run, cards_updated_today) = {
      let stats = self.stats.read().unwrap_or_else(PoisonError::into_inner);
      (stats.last_run, stats.cards_updated_today)
    };
    let interval = chrono::Duration::from_std(self.config.interval).ok();
    let quota = self.provider.quota().snapshot();

    WorkerStatus {
      last_update_time: last_run,
      next_update_time: last_run.zip(interval).map(|(at, every)| at + every),
      cards_updated_today,
      batch_size: self.config.batch_size,
      queue_size: self.queue.len(),
      daily_limit: quota.daily_limit,
      remaining: quota.remaining,
      resets_at: quota.resets_at,
      monthly_limit: quota.monthly_limit,
      used_this_month: quota.used_this_month,
      unmatched_cards: self.unmatched.list(),
      last_cycle: self.tracker.last().await,
    }
  }

  pub async fn history(&self) -> Vec<CycleReport> {
    self.tracker.get_all().await
  }

  /// Reset the "updated today" counter once the local date moves on
  fn roll_daily_stats(&self) {
    let today = self.clock.now().date_naive();
    let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
    if stats.day != today {
      debug!("new day {}, resetting daily counter from {}", today, stats.cards_updated_today);
      stats.day = today;
      stats.cards_updated_today = 0;
    }
  }
}
