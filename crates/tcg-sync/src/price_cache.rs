//! Cached price reads with fallback, and the write path for fetched prices.

use crate::error::SyncResult;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tcg_core::{CardRef, Clock, Condition, Language, PriceEntry, Printing, CACHED_SOURCE};
use tcg_database_postgres::{CardRepository, PriceRepository};
use tracing::{debug, warn};

/// A price answer: amount, where it came from, and whether it is past the threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
  pub price_usd: f64,
  pub source: String,
  pub is_stale: bool,
  pub condition: Condition,
  pub printing: Printing,
  pub updated_at: Option<DateTime<Utc>>,
}

pub struct PriceCache {
  prices: Arc<dyn PriceRepository>,
  cards: Arc<dyn CardRepository>,
  clock: Arc<dyn Clock>,
  stale_after: Duration,
}

impl PriceCache {
  pub fn new(
    prices: Arc<dyn PriceRepository>,
    cards: Arc<dyn CardRepository>,
    clock: Arc<dyn Clock>,
    stale_after: Duration,
  ) -> Self {
    Self { prices, cards, clock, stale_after }
  }

  pub fn stale_after(&self) -> Duration {
    self.stale_after
  }

  /// Price for one condition and printing, or `None`.
  ///
  /// Tries the exact row, then the NM row of the same printing, then the
  /// card's base price. Store failures read as "no cached price".
  pub async fn get(
    &self,
    card_id: &str,
    condition: Condition,
    printing: Printing,
  ) -> Option<PriceQuote> {
    let rows = self.read_rows(card_id).await;
    if let Some(quote) = self.quote_from_rows(&rows, condition, printing) {
      return Some(quote);
    }

    let card = match self.cards.find_by_id(card_id).await {
      Ok(card) => card?,
      Err(e) => {
        warn!("card read failed for {}: {}", card_id, e);
        return None;
      }
    };
    self.quote_from_base(&card, condition, printing)
  }

  /// Same as [`get`](Self::get) for a card already in hand
  pub async fn get_for_card(
    &self,
    card: &CardRef,
    condition: Condition,
    printing: Printing,
  ) -> Option<PriceQuote> {
    let rows = self.read_rows(&card.id).await;
    self
      .quote_from_rows(&rows, condition, printing)
      .or_else(|| self.quote_from_base(card, condition, printing))
  }

  /// Every cached row, or NM rows synthesized from the base price fields
  pub async fn get_all(&self, card_id: &str) -> Vec<PriceEntry> {
    let rows = self.read_rows(card_id).await;
    if !rows.is_empty() {
      return rows;
    }

    match self.cards.find_by_id(card_id).await {
      Ok(Some(card)) => synthesize_base_rows(&card),
      Ok(None) => Vec::new(),
      Err(e) => {
        warn!("card read failed for {}: {}", card_id, e);
        Vec::new()
      }
    }
  }

  /// True when nothing is cached or any cached row is past the threshold.
  /// A failed read counts as needing a refresh.
  pub async fn needs_refresh(&self, card_id: &str) -> bool {
    match self.prices.find_all_for_card(card_id).await {
      Ok(rows) => rows.is_empty() || rows.iter().any(|row| self.is_stale(row.updated_at)),
      Err(e) => {
        debug!("price read failed for {}, treating as stale: {}", card_id, e);
        true
      }
    }
  }

  /// Upsert fetched prices, mirror NM onto the card and persist it.
  ///
  /// Entries without a timestamp are stamped now. Returns the number of rows written.
  pub async fn save(&self, card: &mut CardRef, prices: &[PriceEntry]) -> SyncResult<usize> {
    if prices.is_empty() {
      return Ok(0);
    }

    let now = self.clock.now_utc();
    let stamped: Vec<PriceEntry> = prices
      .iter()
      .map(|p| PriceEntry {
        card_id: card.id.clone(),
        updated_at: p.updated_at.or(Some(now)),
        ..p.clone()
      })
      .collect();

    let written = self.prices.upsert_many(&stamped).await?;
    if written == 0 {
      debug!("cached prices for {} are newer, card left unchanged", card.id);
      return Ok(0);
    }

    // mirror what the cache now holds, not what was offered
    let stored = match self.prices.find_all_for_card(&card.id).await {
      Ok(rows) if !rows.is_empty() => rows,
      Ok(_) => stamped,
      Err(e) => {
        warn!("price re-read failed for {}, mirroring fetched rows: {}", card.id, e);
        stamped
      }
    };
    card.apply_prices(&stored, now);
    self.cards.save_card_pricing(card).await?;

    debug!("saved {} prices for {} ({} rows written)", prices.len(), card.id, written);
    Ok(written)
  }

  async fn read_rows(&self, card_id: &str) -> Vec<PriceEntry> {
    match self.prices.find_all_for_card(card_id).await {
      Ok(rows) => rows,
      Err(e) => {
        warn!("price read failed for {}: {}", card_id, e);
        Vec::new()
      }
    }
  }

  fn quote_from_rows(
    &self,
    rows: &[PriceEntry],
    condition: Condition,
    printing: Printing,
  ) -> Option<PriceQuote> {
    let pick = |condition: Condition| {
      let matches = |p: &&PriceEntry| p.condition == condition && p.printing == printing;
      rows
        .iter()
        .filter(matches)
        .find(|p| p.language == Language::English)
        .or_else(|| rows.iter().find(matches))
    };

    let row = pick(condition).or_else(|| {
      if condition == Condition::NearMint {
        None
      } else {
        pick(Condition::NearMint)
      }
    })?;

    Some(PriceQuote {
      price_usd: row.price_usd,
      source: row.source.clone(),
      is_stale: self.is_stale(row.updated_at),
      condition: row.condition,
      printing: row.printing,
      updated_at: row.updated_at,
    })
  }

  fn quote_from_base(
    &self,
    card: &CardRef,
    condition: Condition,
    printing: Printing,
  ) -> Option<PriceQuote> {
    let price = card.base_price(printing)?;
    Some(PriceQuote {
      price_usd: price,
      source: CACHED_SOURCE.to_string(),
      is_stale: self.is_stale(card.price_updated_at),
      condition,
      printing,
      updated_at: card.price_updated_at,
    })
  }

  /// Only a known timestamp can be stale
  fn is_stale(&self, updated_at: Option<DateTime<Utc>>) -> bool {
    updated_at.is_some_and(|at| self.clock.now_utc() - at > self.stale_after)
  }
}

fn synthesize_base_rows(card: &CardRef) -> Vec<PriceEntry> {
  let row = |printing: Printing, price: f64| PriceEntry {
    card_id: card.id.clone(),
    condition: Condition::NearMint,
    printing,
    language: Language::English,
    price_usd: price,
    source: CACHED_SOURCE.to_string(),
    updated_at: card.price_updated_at,
  };

  let mut rows = Vec::new();
  if card.price_usd > 0.0 {
    rows.push(row(Printing::Normal, card.price_usd));
  }
  if card.price_foil_usd > 0.0 {
    rows.push(row(Printing::Foil, card.price_foil_usd));
  }
  rows
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{pokemon_card, MemoryStore};
  use pretty_assertions::assert_eq;
  use tcg_core::ManualClock;

  struct Fixture {
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    cache: PriceCache,
  }

  fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::at(2025, 3, 10, 12, 0));
    let cache = PriceCache::new(store.clone(), store.clone(), clock.clone(), Duration::hours(24));
    store.add_card(pokemon_card("c1", "Pikachu", "foo-set", "073/102"), true);
    Fixture { store, clock, cache }
  }

  fn row(condition: Condition, printing: Printing, price: f64, at: DateTime<Utc>) -> PriceEntry {
    PriceEntry {
      card_id: "c1".to_string(),
      condition,
      printing,
      language: Language::English,
      price_usd: price,
      source: "justtcg".to_string(),
      updated_at: Some(at),
    }
  }

  #[tokio::test]
  async fn test_no_rows_no_base_price_is_none() {
    let f = fixture();
    for condition in Condition::ALL {
      for printing in Printing::ALL {
        assert_eq!(f.cache.get("c1", condition, printing).await, None);
      }
    }
    assert_eq!(f.cache.get("missing", Condition::NearMint, Printing::Normal).await, None);
  }

  #[tokio::test]
  async fn test_exact_row_wins() {
    let f = fixture();
    let now = f.clock.now_utc();
    f.store.insert_price(row(Condition::LightlyPlayed, Printing::Normal, 4.0, now));
    f.store.insert_price(row(Condition::NearMint, Printing::Normal, 5.0, now));

    let quote = f.cache.get("c1", Condition::LightlyPlayed, Printing::Normal).await.unwrap();
    assert_eq!(quote.price_usd, 4.0);
    assert_eq!(quote.condition, Condition::LightlyPlayed);
    assert!(!quote.is_stale);
  }

  #[tokio::test]
  async fn test_nm_substitutes_before_base_price() {
    let f = fixture();
    let mut card = pokemon_card("c1", "Pikachu", "foo-set", "073/102");
    card.price_usd = 1.0;
    f.store.add_card(card, true);
    f.store.insert_price(row(Condition::NearMint, Printing::Normal, 5.0, f.clock.now_utc()));

    let quote = f.cache.get("c1", Condition::LightlyPlayed, Printing::Normal).await.unwrap();
    assert_eq!(quote.price_usd, 5.0);
    assert_eq!(quote.source, "justtcg");
    assert_eq!(quote.condition, Condition::NearMint);
  }

  #[tokio::test]
  async fn test_base_price_fallback_matches_foil_class() {
    let f = fixture();
    let mut card = pokemon_card("c1", "Pikachu", "foo-set", "073/102");
    card.price_usd = 2.0;
    card.price_foil_usd = 8.0;
    f.store.add_card(card, true);

    let foil = f.cache.get("c1", Condition::NearMint, Printing::ReverseHolo).await.unwrap();
    assert_eq!(foil.price_usd, 8.0);
    assert_eq!(foil.source, CACHED_SOURCE);

    let normal = f.cache.get("c1", Condition::HeavilyPlayed, Printing::FirstEdition).await.unwrap();
    assert_eq!(normal.price_usd, 2.0);
    assert!(!normal.is_stale);
  }

  #[tokio::test]
  async fn test_stale_row_is_flagged_not_dropped() {
    let f = fixture();
    let old = f.clock.now_utc() - Duration::hours(25);
    f.store.insert_price(row(Condition::NearMint, Printing::Normal, 12.5, old));

    let quote = f.cache.get("c1", Condition::NearMint, Printing::Normal).await.unwrap();
    assert_eq!(quote.price_usd, 12.5);
    assert!(quote.is_stale);
    assert_eq!(quote.source, "justtcg");
  }

  #[tokio::test]
  async fn test_read_failure_degrades_to_none() {
    let f = fixture();
    f.store.insert_price(row(Condition::NearMint, Printing::Normal, 5.0, f.clock.now_utc()));
    f.store.set_fail_reads(true);

    assert_eq!(f.cache.get("c1", Condition::NearMint, Printing::Normal).await, None);
    assert!(f.cache.get_all("c1").await.is_empty());
    assert!(f.cache.needs_refresh("c1").await);
  }

  #[tokio::test]
  async fn test_get_all_synthesizes_base_rows() {
    let f = fixture();
    let mut card = pokemon_card("c1", "Pikachu", "foo-set", "073/102");
    card.price_usd = 2.0;
    card.price_foil_usd = 6.0;
    f.store.add_card(card, true);

    let rows = f.cache.get_all("c1").await;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.condition == Condition::NearMint && r.source == CACHED_SOURCE));
    assert_eq!(rows[1].printing, Printing::Foil);
  }

  #[tokio::test]
  async fn test_save_is_idempotent_and_mirrors_nm() {
    let f = fixture();
    let mut card = f.store.card("c1").unwrap();
    let now = f.clock.now_utc();
    let prices = vec![
      row(Condition::NearMint, Printing::Normal, 5.0, now),
      row(Condition::LightlyPlayed, Printing::Normal, 4.0, now),
    ];

    f.cache.save(&mut card, &prices).await.unwrap();
    f.cache.save(&mut card, &prices).await.unwrap();

    assert_eq!(f.store.price_rows(), 2);
    let stored = f.store.card("c1").unwrap();
    assert_eq!(stored.price_usd, 5.0);
    assert_eq!(stored.price_updated_at, Some(now));
  }

  #[tokio::test]
  async fn test_save_keeps_newer_row() {
    let f = fixture();
    let mut card = f.store.card("c1").unwrap();
    let now = f.clock.now_utc();

    f.cache.save(&mut card, &[row(Condition::NearMint, Printing::Normal, 7.0, now)]).await.unwrap();
    let older = row(Condition::NearMint, Printing::Normal, 3.0, now - Duration::hours(1));
    f.cache.save(&mut card, &[older]).await.unwrap();

    assert_eq!(f.store.prices_for("c1")[0].price_usd, 7.0);
  }

  #[tokio::test]
  async fn test_older_save_leaves_base_price_alone() {
    let f = fixture();
    let mut card = f.store.card("c1").unwrap();
    let now = f.clock.now_utc();

    let written = f
      .cache
      .save(&mut card, &[row(Condition::NearMint, Printing::Normal, 7.0, now)])
      .await
      .unwrap();
    assert_eq!(written, 1);

    f.clock.advance(Duration::minutes(5));
    let mut stale_copy = f.store.card("c1").unwrap();
    let older = row(Condition::NearMint, Printing::Normal, 3.0, now - Duration::hours(1));
    let written = f.cache.save(&mut stale_copy, &[older]).await.unwrap();

    assert_eq!(written, 0);
    assert_eq!(f.store.prices_for("c1")[0].price_usd, 7.0);
    let stored = f.store.card("c1").unwrap();
    assert_eq!(stored.price_usd, 7.0);
    assert_eq!(stored.price_updated_at, Some(now));
  }

  #[tokio::test]
  async fn test_needs_refresh() {
    let f = fixture();
    assert!(f.cache.needs_refresh("c1").await);

    f.store.insert_price(row(Condition::NearMint, Printing::Normal, 5.0, f.clock.now_utc()));
    assert!(!f.cache.needs_refresh("c1").await);

    f.clock.advance(Duration::hours(25));
    assert!(f.cache.needs_refresh("c1").await);
  }
}
