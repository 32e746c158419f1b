//! In-memory stand-ins for the database and the pricing provider.

use crate::provider::PriceProvider;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tcg_client::endpoints::cards::reconcile;
use tcg_client::normalize::variants_to_prices;
use tcg_client::{PriceMap, QuotaGovernor, SetPage};
use tcg_core::{CardRef, Error, Game, LookupRequest, ManualClock, PriceEntry, Result};
use tcg_database_postgres::{
  dedupe_by_key, CardRepository, MissingIdFilter, PriceRepository, RepositoryError,
  RepositoryResult,
};
use tcg_models::{ProviderCard, ProviderVariant};
use tokio_util::sync::CancellationToken;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A Pokemon card with no identifier and no price
pub fn pokemon_card(id: &str, name: &str, set_name: &str, card_number: &str) -> CardRef {
  CardRef {
    id: id.to_string(),
    game: Game::Pokemon,
    name: name.to_string(),
    set_name: set_name.to_string(),
    set_code: String::new(),
    card_number: card_number.to_string(),
    provider_id: None,
    price_usd: 0.0,
    price_foil_usd: 0.0,
    price_source: None,
    price_updated_at: None,
    last_price_check: None,
  }
}

/// An Mtg card; its id doubles as the alternate identifier
pub fn mtg_card(scryfall_id: &str, name: &str) -> CardRef {
  CardRef { game: Game::Mtg, ..pokemon_card(scryfall_id, name, "Alpha", "1") }
}

/// A set listing entry without prices
pub fn listed_card(number: &str, name: &str, provider_id: &str) -> ProviderCard {
  ProviderCard {
    id: format!("listing-{}", provider_id),
    name: name.to_string(),
    game: Some("pokemon".to_string()),
    set: None,
    set_name: None,
    number: Some(number.to_string()),
    tcgplayer_id: Some(provider_id.to_string()),
    scryfall_id: None,
    rarity: None,
    variants: Vec::new(),
  }
}

pub fn variant(condition: &str, printing: &str, price: f64) -> ProviderVariant {
  ProviderVariant {
    id: None,
    condition: condition.to_string(),
    printing: printing.to_string(),
    language: None,
    price: Some(price),
    last_updated: None,
  }
}

/// Cards, collection membership and price rows held in memory
#[derive(Default)]
pub struct MemoryStore {
  cards: Mutex<BTreeMap<String, CardRef>>,
  collection: Mutex<HashSet<String>>,
  prices: Mutex<Vec<PriceEntry>>,
  fail_reads: AtomicBool,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_card(&self, card: CardRef, in_collection: bool) {
    if in_collection {
      lock(&self.collection).insert(card.id.clone());
    }
    lock(&self.cards).insert(card.id.clone(), card);
  }

  pub fn card(&self, card_id: &str) -> Option<CardRef> {
    lock(&self.cards).get(card_id).cloned()
  }

  pub fn insert_price(&self, entry: PriceEntry) {
    lock(&self.prices).push(entry);
  }

  pub fn prices_for(&self, card_id: &str) -> Vec<PriceEntry> {
    lock(&self.prices).iter().filter(|p| p.card_id == card_id).cloned().collect()
  }

  pub fn price_rows(&self) -> usize {
    lock(&self.prices).len()
  }

  /// Make every price and card read fail, as a dropped connection would
  pub fn set_fail_reads(&self, fail: bool) {
    self.fail_reads.store(fail, Ordering::SeqCst);
  }

  fn check_reads(&self) -> RepositoryResult<()> {
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(RepositoryError::PoolError("connection refused".to_string()));
    }
    Ok(())
  }

  fn collection_cards(&self, exclude: &[String]) -> Vec<CardRef> {
    let collection = lock(&self.collection).clone();
    lock(&self.cards)
      .values()
      .filter(|c| collection.contains(&c.id) && !exclude.contains(&c.id))
      .cloned()
      .collect()
  }
}

#[async_trait]
impl CardRepository for MemoryStore {
  async fn find_by_id(&self, card_id: &str) -> RepositoryResult<Option<CardRef>> {
    self.check_reads()?;
    Ok(self.card(card_id))
  }

  async fn find_by_ids(&self, card_ids: &[String]) -> RepositoryResult<Vec<CardRef>> {
    self.check_reads()?;
    let cards = lock(&self.cards);
    Ok(card_ids.iter().filter_map(|id| cards.get(id).cloned()).collect())
  }

  async fn collection_cards_without_prices(
    &self,
    exclude: &[String],
    limit: usize,
  ) -> RepositoryResult<Vec<CardRef>> {
    self.check_reads()?;
    let priced: HashSet<String> = lock(&self.prices).iter().map(|p| p.card_id.clone()).collect();
    Ok(
      self
        .collection_cards(exclude)
        .into_iter()
        .filter(|c| !priced.contains(&c.id))
        .take(limit)
        .collect(),
    )
  }

  async fn collection_cards_oldest_priced(
    &self,
    exclude: &[String],
    limit: usize,
  ) -> RepositoryResult<Vec<CardRef>> {
    self.check_reads()?;
    let mut cards = self.collection_cards(exclude);
    // None sorts before Some, matching NULLS FIRST
    cards.sort_by(|a, b| a.price_updated_at.cmp(&b.price_updated_at).then(a.id.cmp(&b.id)));
    cards.truncate(limit);
    Ok(cards)
  }

  async fn cards_missing_provider_id(
    &self,
    filter: &MissingIdFilter,
  ) -> RepositoryResult<Vec<CardRef>> {
    self.check_reads()?;
    let collection = lock(&self.collection).clone();
    Ok(
      lock(&self.cards)
        .values()
        .filter(|c| c.game == filter.game && !c.has_provider_id())
        .filter(|c| !filter.collection_only || collection.contains(&c.id))
        .filter(|c| match filter.set_key.as_deref() {
          Some(key) => c.set_name == key || c.set_code == key,
          None => true,
        })
        .cloned()
        .collect(),
    )
  }

  async fn set_provider_id(&self, card_id: &str, provider_id: &str) -> RepositoryResult<bool> {
    let mut cards = lock(&self.cards);
    match cards.get_mut(card_id) {
      Some(card) => Ok(card.assign_provider_id(provider_id)),
      None => Ok(false),
    }
  }

  async fn save_card_pricing(&self, card: &CardRef) -> RepositoryResult<()> {
    let mut cards = lock(&self.cards);
    let stored = cards
      .get_mut(&card.id)
      .ok_or_else(|| RepositoryError::NotFound(format!("card {}", card.id)))?;
    stored.price_usd = card.price_usd;
    stored.price_foil_usd = card.price_foil_usd;
    stored.price_source = card.price_source.clone();
    stored.price_updated_at = card.price_updated_at;
    stored.last_price_check = card.last_price_check;
    Ok(())
  }
}

#[async_trait]
impl PriceRepository for MemoryStore {
  async fn find_all_for_card(&self, card_id: &str) -> RepositoryResult<Vec<PriceEntry>> {
    self.check_reads()?;
    let mut rows = self.prices_for(card_id);
    rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(rows)
  }

  async fn upsert_many(&self, entries: &[PriceEntry]) -> RepositoryResult<usize> {
    let mut rows = lock(&self.prices);
    let mut written = 0;

    for entry in dedupe_by_key(entries) {
      match rows.iter_mut().find(|row| row.key() == entry.key()) {
        Some(row) if row.updated_at > entry.updated_at => {}
        Some(row) => {
          *row = entry;
          written += 1;
        }
        None => {
          rows.push(entry);
          written += 1;
        }
      }
    }
    Ok(written)
  }
}

/// Scripted provider sharing a real [`QuotaGovernor`] on a manual clock
pub struct FakeProvider {
  quota: Arc<QuotaGovernor>,
  clock: Arc<ManualClock>,
  max_batch_size: usize,
  page_size: usize,
  sets: Mutex<HashMap<String, Vec<ProviderCard>>>,
  priced: Mutex<HashMap<String, ProviderCard>>,
  search_results: Mutex<HashMap<String, ProviderCard>>,
  failing_sets: Mutex<HashSet<String>>,
  reject_batches: AtomicBool,
  drain_before_batch: AtomicBool,
  batch_calls: AtomicUsize,
  set_page_calls: AtomicUsize,
  search_calls: AtomicUsize,
  batches: Mutex<Vec<Vec<String>>>,
}

impl FakeProvider {
  pub fn new(daily_limit: u32) -> Self {
    let clock = Arc::new(ManualClock::at(2025, 3, 10, 12, 0));
    let quota = Arc::new(QuotaGovernor::new(daily_limit, None, clock.clone()));
    Self {
      quota,
      clock,
      max_batch_size: tcg_core::DEFAULT_MAX_BATCH_SIZE,
      page_size: tcg_core::DEFAULT_SET_PAGE_SIZE,
      sets: Mutex::new(HashMap::new()),
      priced: Mutex::new(HashMap::new()),
      search_results: Mutex::new(HashMap::new()),
      failing_sets: Mutex::new(HashSet::new()),
      reject_batches: AtomicBool::new(false),
      drain_before_batch: AtomicBool::new(false),
      batch_calls: AtomicUsize::new(0),
      set_page_calls: AtomicUsize::new(0),
      search_calls: AtomicUsize::new(0),
      batches: Mutex::new(Vec::new()),
    }
  }

  pub fn with_page_size(mut self, page_size: usize) -> Self {
    self.page_size = page_size;
    self
  }

  pub fn with_max_batch_size(mut self, max: usize) -> Self {
    self.max_batch_size = max;
    self
  }

  pub fn clock(&self) -> Arc<ManualClock> {
    Arc::clone(&self.clock)
  }

  pub fn add_set(&self, provider_set_key: &str, cards: Vec<ProviderCard>) {
    lock(&self.sets).insert(provider_set_key.to_string(), cards);
  }

  /// Listing pages for this set fail with a transport error
  pub fn fail_set(&self, provider_set_key: &str) {
    lock(&self.failing_sets).insert(provider_set_key.to_string());
  }

  /// Prices returned for a provider id in batched lookups
  pub fn price(&self, provider_id: &str, variants: Vec<ProviderVariant>) {
    let card = ProviderCard { variants, ..listed_card("", "", provider_id) };
    lock(&self.priced).insert(provider_id.to_string(), card);
  }

  /// Prices returned for an alternate (Scryfall) id in batched lookups
  pub fn price_alternate(&self, alternate_id: &str, variants: Vec<ProviderVariant>) {
    let card = ProviderCard {
      tcgplayer_id: None,
      scryfall_id: Some(alternate_id.to_string()),
      variants,
      ..listed_card("", "", alternate_id)
    };
    lock(&self.priced).insert(alternate_id.to_string(), card);
  }

  pub fn search_result(&self, name: &str, variants: Vec<ProviderVariant>) {
    let card = ProviderCard { variants, ..listed_card("", name, "search") };
    lock(&self.search_results).insert(name.to_string(), card);
  }

  /// Batched lookups answer with a provider error payload
  pub fn reject_batches(&self) {
    self.reject_batches.store(true, Ordering::SeqCst);
  }

  /// Someone else spends the remaining budget just before the next batch
  pub fn drain_quota_before_batch(&self) {
    self.drain_before_batch.store(true, Ordering::SeqCst);
  }

  pub fn batch_calls(&self) -> usize {
    self.batch_calls.load(Ordering::SeqCst)
  }

  pub fn set_page_calls(&self) -> usize {
    self.set_page_calls.load(Ordering::SeqCst)
  }

  pub fn search_calls(&self) -> usize {
    self.search_calls.load(Ordering::SeqCst)
  }

  /// Card ids of every batch sent, in call order
  pub fn batches(&self) -> Vec<Vec<String>> {
    lock(&self.batches).clone()
  }

  fn spend(&self, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
      return Err(Error::Cancelled);
    }
    if !self.quota.try_reserve() {
      return Err(Error::QuotaExhausted { resets_at: self.quota.reset_time() });
    }
    Ok(())
  }
}

#[async_trait]
impl PriceProvider for FakeProvider {
  async fn fetch_by_identifiers(
    &self,
    batch: &[LookupRequest],
    cancel: &CancellationToken,
  ) -> Result<PriceMap> {
    if batch.len() > self.max_batch_size {
      return Err(Error::BatchTooLarge { size: batch.len(), max: self.max_batch_size });
    }
    let usable: Vec<&LookupRequest> = batch.iter().filter(|l| l.has_identifier()).collect();
    if usable.is_empty() {
      return Ok(PriceMap::new());
    }

    if self.drain_before_batch.load(Ordering::SeqCst) {
      while self.quota.try_reserve() {}
    }
    self.spend(cancel)?;
    self.batch_calls.fetch_add(1, Ordering::SeqCst);
    lock(&self.batches).push(usable.iter().map(|l| l.card_id.clone()).collect());

    if self.reject_batches.load(Ordering::SeqCst) {
      return Err(Error::Provider {
        code: Some("BAD_REQUEST".to_string()),
        message: "invalid batch".to_string(),
      });
    }

    let priced = lock(&self.priced);
    // answer in reverse request order
    let cards: Vec<ProviderCard> = usable
      .iter()
      .rev()
      .filter_map(|l| {
        l.provider_id
          .as_deref()
          .and_then(|id| priced.get(id))
          .or_else(|| l.alternate_id.as_deref().and_then(|id| priced.get(id)))
          .cloned()
      })
      .collect();
    Ok(reconcile(&usable, cards))
  }

  async fn fetch_by_search(
    &self,
    lookup: &LookupRequest,
    cancel: &CancellationToken,
  ) -> Result<Vec<PriceEntry>> {
    self.spend(cancel)?;
    self.search_calls.fetch_add(1, Ordering::SeqCst);
    Ok(
      lock(&self.search_results)
        .get(&lookup.name)
        .map(|card| variants_to_prices(&lookup.card_id, &card.variants, Utc::now()))
        .unwrap_or_default(),
    )
  }

  async fn fetch_set_page(
    &self,
    set_key: &str,
    offset: usize,
    cancel: &CancellationToken,
  ) -> Result<SetPage> {
    self.spend(cancel)?;
    self.set_page_calls.fetch_add(1, Ordering::SeqCst);

    if lock(&self.failing_sets).contains(set_key) {
      return Err(Error::Transport("connection reset".to_string()));
    }

    let sets = lock(&self.sets);
    let listing = sets.get(set_key).map(Vec::as_slice).unwrap_or_default();
    let start = offset.min(listing.len());
    let end = (start + self.page_size).min(listing.len());
    Ok(SetPage { cards: listing[start..end].to_vec(), has_more: end < listing.len() })
  }

  fn quota(&self) -> Arc<QuotaGovernor> {
    Arc::clone(&self.quota)
  }

  fn max_batch_size(&self) -> usize {
    self.max_batch_size
  }
}
