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

//! Database repository abstraction layer
//!
//! Card references and the price cache behind two async traits, so the sync
//! engine can run against Postgres in production and in-memory fakes in tests.
//! All diesel work runs on the blocking pool via `DatabaseContext::run`.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tcg_core::{CardRef, Condition, Game, Language, PriceEntry, Printing};
use thiserror::Error;

use crate::models::{into_card_refs, Card, CardPrice, CardPricingUpdate, PriceColumns};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

const MAX_POOL_SIZE: u32 = 10;
const MIN_POOL_IDLE: u32 = 2;
/// Connection timeout in seconds - pool will fail instead of retrying forever
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Database repository errors
#[derive(Error, Debug)]
pub enum RepositoryError {
  #[error("Connection pool error: {0}")]
  PoolError(String),

  #[error("Database query error: {0}")]
  QueryError(String),

  #[error("Serialization error: {0}")]
  SerializationError(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Constraint violation: {0}")]
  ConstraintViolation(String),
}

impl From<DieselError> for RepositoryError {
  fn from(err: DieselError) -> Self {
    match err {
      DieselError::NotFound => RepositoryError::NotFound("Record not found".to_string()),
      DieselError::DatabaseError(kind, info) => match kind {
        diesel::result::DatabaseErrorKind::UniqueViolation
        | diesel::result::DatabaseErrorKind::ForeignKeyViolation => {
          RepositoryError::ConstraintViolation(info.message().to_string())
        }
        _ => RepositoryError::QueryError(info.message().to_string()),
      },
      _ => RepositoryError::QueryError(err.to_string()),
    }
  }
}

impl From<diesel::r2d2::PoolError> for RepositoryError {
  fn from(err: diesel::r2d2::PoolError) -> Self {
    RepositoryError::PoolError(err.to_string())
  }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Card reference storage. The engine only writes the provider identifier
/// and the pricing columns.
#[async_trait]
pub trait CardRepository: Send + Sync {
  async fn find_by_id(&self, card_id: &str) -> RepositoryResult<Option<CardRef>>;

  /// Load cards by id, returned in the order of `card_ids`; unknown ids are skipped
  async fn find_by_ids(&self, card_ids: &[String]) -> RepositoryResult<Vec<CardRef>>;

  /// Collection cards with no cached price row at all
  async fn collection_cards_without_prices(
    &self,
    exclude: &[String],
    limit: usize,
  ) -> RepositoryResult<Vec<CardRef>>;

  /// Collection cards ordered by price timestamp, never-priced first
  async fn collection_cards_oldest_priced(
    &self,
    exclude: &[String],
    limit: usize,
  ) -> RepositoryResult<Vec<CardRef>>;

  /// Cards with no provider identifier, selected by `filter`
  async fn cards_missing_provider_id(
    &self,
    filter: &MissingIdFilter,
  ) -> RepositoryResult<Vec<CardRef>>;

  /// Store a discovered identifier. Returns false when the card already had one.
  async fn set_provider_id(&self, card_id: &str, provider_id: &str) -> RepositoryResult<bool>;

  /// Persist base prices and the price/check timestamps
  async fn save_card_pricing(&self, card: &CardRef) -> RepositoryResult<()>;
}

/// Selection for cards that still need identifier discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingIdFilter {
  pub game: Game,
  /// Limit to one set, matched on set name or set code
  pub set_key: Option<String>,
  /// Only cards that appear in at least one collection
  pub collection_only: bool,
}

impl MissingIdFilter {
  /// Every collection card of `game` lacking an identifier
  pub fn collection(game: Game) -> Self {
    Self { game, set_key: None, collection_only: true }
  }

  /// Every card of `game` in one set, owned or not
  pub fn set(game: Game, set_key: impl Into<String>) -> Self {
    Self { game, set_key: Some(set_key.into()), collection_only: false }
  }
}

/// Price cache rows
#[async_trait]
pub trait PriceRepository: Send + Sync {
  /// Every cached row for a card, newest first
  async fn find_all_for_card(&self, card_id: &str) -> RepositoryResult<Vec<PriceEntry>>;

  /// Bulk upsert keyed on (card_id, condition, printing, language).
  /// A row is only overwritten by an entry at least as new as itself.
  async fn upsert_many(&self, entries: &[PriceEntry]) -> RepositoryResult<usize>;
}

/// Keep the last entry per price key, in first-seen key order.
///
/// One upsert statement may not touch the same row twice, so duplicates in a
/// provider response have to be collapsed before writing.
pub fn dedupe_by_key(entries: &[PriceEntry]) -> Vec<PriceEntry> {
  let mut index: HashMap<(String, Condition, Printing, Language), usize> = HashMap::new();
  let mut out: Vec<PriceEntry> = Vec::with_capacity(entries.len());

  for entry in entries {
    let key = (entry.card_id.clone(), entry.condition, entry.printing, entry.language);
    match index.get(&key) {
      Some(&pos) => out[pos] = entry.clone(),
      None => {
        index.insert(key, out.len());
        out.push(entry.clone());
      }
    }
  }
  out
}

/// Database context that provides access to repositories and connection pool
#[derive(Clone)]
pub struct DatabaseContext {
  pool: Arc<DbPool>,
}

impl DatabaseContext {
  /// Create a new database context with connection pooling
  ///
  /// Fails fast if the database is unavailable by testing the connection at startup.
  pub fn new(database_url: &str) -> RepositoryResult<Self> {
    Self::with_pool_config(database_url, MAX_POOL_SIZE, MIN_POOL_IDLE)
  }

  /// Create with custom pool configuration
  pub fn with_pool_config(
    database_url: &str,
    max_size: u32,
    min_idle: u32,
  ) -> RepositoryResult<Self> {
    // Test connection BEFORE creating the pool to fail fast without background retry noise
    PgConnection::establish(database_url).map_err(|e| {
      RepositoryError::PoolError(format!("Failed to connect to database: {}", e))
    })?;

    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
      .max_size(max_size)
      .min_idle(Some(min_idle.min(max_size)))
      .connection_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
      .build(manager)
      .map_err(|e| RepositoryError::PoolError(e.to_string()))?;

    Ok(Self { pool: Arc::new(pool) })
  }

  /// Get a connection from the pool
  pub fn get_connection(&self) -> RepositoryResult<DbConnection> {
    self.pool.get().map_err(|e| RepositoryError::PoolError(e.to_string()))
  }

  /// Execute a blocking database operation asynchronously
  pub async fn run<F, R>(&self, f: F) -> RepositoryResult<R>
  where
    F: FnOnce(&mut DbConnection) -> RepositoryResult<R> + Send + 'static,
    R: Send + 'static,
  {
    let pool = Arc::clone(&self.pool);
    tokio::task::spawn_blocking(move || {
      let mut conn = pool.get().map_err(|e| {
        warn!("Failed to get pooled connection: {}", e);
        RepositoryError::PoolError(e.to_string())
      })?;
      f(&mut conn)
    })
    .await
    .map_err(|e| RepositoryError::QueryError(format!("Task join error: {}", e)))?
  }

  /// Create a card repository instance
  pub fn card_repository(&self) -> Arc<dyn CardRepository> {
    Arc::new(CardRepositoryImpl { ctx: self.clone() })
  }

  /// Create a price repository instance
  pub fn price_repository(&self) -> Arc<dyn PriceRepository> {
    Arc::new(PriceRepositoryImpl { ctx: self.clone() })
  }
}

/// Implementation of card repository
struct CardRepositoryImpl {
  ctx: DatabaseContext,
}

const WITHOUT_PRICES_SQL: &str = "SELECT c.* FROM cards c
   WHERE EXISTS (SELECT 1 FROM collection_items ci WHERE ci.card_id = c.id)
     AND NOT EXISTS (SELECT 1 FROM card_prices cp WHERE cp.card_id = c.id)
     AND c.id <> ALL($1)
   ORDER BY c.created_at ASC, c.id ASC
   LIMIT $2";

const OLDEST_PRICED_SQL: &str = "SELECT c.* FROM cards c
   WHERE EXISTS (SELECT 1 FROM collection_items ci WHERE ci.card_id = c.id)
     AND c.id <> ALL($1)
   ORDER BY c.price_updated_at ASC NULLS FIRST, c.id ASC
   LIMIT $2";

const MISSING_PROVIDER_ID_SQL: &str = "SELECT c.* FROM cards c
   WHERE ($3 = FALSE OR EXISTS (SELECT 1 FROM collection_items ci WHERE ci.card_id = c.id))
     AND c.game = $1
     AND (c.provider_id IS NULL OR c.provider_id = '')
     AND ($2::text IS NULL OR c.set_name = $2 OR c.set_code = $2)
   ORDER BY c.set_name ASC, c.card_number ASC";

#[async_trait]
impl CardRepository for CardRepositoryImpl {
  async fn find_by_id(&self, card_id: &str) -> RepositoryResult<Option<CardRef>> {
    let card_id = card_id.to_string();

    self
      .ctx
      .run(move |conn| {
        use crate::schema::cards;

        let row: Option<Card> =
          cards::table.find(&card_id).select(Card::as_select()).first(conn).optional()?;

        row.map(Card::into_card_ref).transpose()
      })
      .await
  }

  async fn find_by_ids(&self, card_ids: &[String]) -> RepositoryResult<Vec<CardRef>> {
    if card_ids.is_empty() {
      return Ok(Vec::new());
    }
    let card_ids = card_ids.to_vec();

    self
      .ctx
      .run(move |conn| {
        use crate::schema::cards;

        let rows: Vec<Card> =
          cards::table.filter(cards::id.eq_any(&card_ids)).select(Card::as_select()).load(conn)?;

        let order: HashMap<&str, usize> =
          card_ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
        let mut found = into_card_refs(rows);
        found.sort_by_key(|card| order.get(card.id.as_str()).copied().unwrap_or(usize::MAX));
        Ok(found)
      })
      .await
  }

  async fn collection_cards_without_prices(
    &self,
    exclude: &[String],
    limit: usize,
  ) -> RepositoryResult<Vec<CardRef>> {
    self.select_candidates(WITHOUT_PRICES_SQL, exclude, limit).await
  }

  async fn collection_cards_oldest_priced(
    &self,
    exclude: &[String],
    limit: usize,
  ) -> RepositoryResult<Vec<CardRef>> {
    self.select_candidates(OLDEST_PRICED_SQL, exclude, limit).await
  }

  async fn cards_missing_provider_id(
    &self,
    filter: &MissingIdFilter,
  ) -> RepositoryResult<Vec<CardRef>> {
    let game = filter.game;
    let set_key = filter.set_key.clone();
    let collection_only = filter.collection_only;

    self
      .ctx
      .run(move |conn| {
        use diesel::sql_query;
        use diesel::sql_types::{Bool, Nullable, Text};

        let rows: Vec<Card> = sql_query(MISSING_PROVIDER_ID_SQL)
          .bind::<Text, _>(game.as_str())
          .bind::<Nullable<Text>, _>(set_key)
          .bind::<Bool, _>(collection_only)
          .load(conn)?;

        Ok(into_card_refs(rows))
      })
      .await
  }

  async fn set_provider_id(&self, card_id: &str, provider_id: &str) -> RepositoryResult<bool> {
    let card_id = card_id.to_string();
    let provider_id = provider_id.trim().to_string();
    if provider_id.is_empty() {
      return Ok(false);
    }

    self
      .ctx
      .run(move |conn| {
        use diesel::sql_query;
        use diesel::sql_types::{Text, Timestamptz};

        let updated = sql_query(
          "UPDATE cards SET provider_id = $2, updated_at = $3
           WHERE id = $1 AND (provider_id IS NULL OR provider_id = '')",
        )
        .bind::<Text, _>(&card_id)
        .bind::<Text, _>(&provider_id)
        .bind::<Timestamptz, _>(Utc::now())
        .execute(conn)?;

        debug!("set provider id {} on card {}: {} row(s)", provider_id, card_id, updated);
        Ok(updated > 0)
      })
      .await
  }

  async fn save_card_pricing(&self, card: &CardRef) -> RepositoryResult<()> {
    let card_id = card.id.clone();
    let update = CardPricingUpdate::from_card(card, Utc::now());

    self
      .ctx
      .run(move |conn| {
        use crate::schema::cards;

        let updated = diesel::update(cards::table.find(&card_id)).set(&update).execute(conn)?;
        if updated == 0 {
          return Err(RepositoryError::NotFound(format!("card {}", card_id)));
        }
        Ok(())
      })
      .await
  }
}

impl CardRepositoryImpl {
  async fn select_candidates(
    &self,
    sql: &'static str,
    exclude: &[String],
    limit: usize,
  ) -> RepositoryResult<Vec<CardRef>> {
    if limit == 0 {
      return Ok(Vec::new());
    }
    let exclude = exclude.to_vec();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    self
      .ctx
      .run(move |conn| {
        use diesel::sql_query;
        use diesel::sql_types::{Array, BigInt, Text};

        let rows: Vec<Card> = sql_query(sql)
          .bind::<Array<Text>, _>(exclude)
          .bind::<BigInt, _>(limit)
          .load(conn)?;

        Ok(into_card_refs(rows))
      })
      .await
  }
}

/// Implementation of price repository
struct PriceRepositoryImpl {
  ctx: DatabaseContext,
}

#[async_trait]
impl PriceRepository for PriceRepositoryImpl {
  async fn find_all_for_card(&self, card_id: &str) -> RepositoryResult<Vec<PriceEntry>> {
    let card_id = card_id.to_string();

    self
      .ctx
      .run(move |conn| {
        use crate::schema::card_prices;

        let rows: Vec<CardPrice> = card_prices::table
          .filter(card_prices::card_id.eq(&card_id))
          .order(card_prices::updated_at.desc())
          .select(CardPrice::as_select())
          .load(conn)?;

        Ok(rows.into_iter().filter_map(CardPrice::into_entry).collect())
      })
      .await
  }

  async fn upsert_many(&self, entries: &[PriceEntry]) -> RepositoryResult<usize> {
    let cols = PriceColumns::from_entries(&dedupe_by_key(entries), Utc::now());
    if cols.is_empty() {
      return Ok(0);
    }

    self
      .ctx
      .run(move |conn| {
        use diesel::sql_query;
        use diesel::sql_types::{Array, Float8, Text, Timestamptz};

        let written = sql_query(
          "INSERT INTO card_prices
           (card_id, condition, printing, language, price_usd, source, updated_at)
           SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[],
                                $5::float8[], $6::text[], $7::timestamptz[])
           ON CONFLICT (card_id, condition, printing, language) DO UPDATE SET
             price_usd = EXCLUDED.price_usd,
             source = EXCLUDED.source,
             updated_at = EXCLUDED.updated_at
           WHERE card_prices.updated_at <= EXCLUDED.updated_at",
        )
        .bind::<Array<Text>, _>(cols.card_ids)
        .bind::<Array<Text>, _>(cols.conditions)
        .bind::<Array<Text>, _>(cols.printings)
        .bind::<Array<Text>, _>(cols.languages)
        .bind::<Array<Float8>, _>(cols.prices)
        .bind::<Array<Text>, _>(cols.sources)
        .bind::<Array<Timestamptz>, _>(cols.updated_at)
        .execute(conn)?;

        Ok(written)
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn entry(card_id: &str, condition: Condition, price: f64) -> PriceEntry {
    PriceEntry {
      card_id: card_id.to_string(),
      condition,
      printing: Printing::Normal,
      language: Language::English,
      price_usd: price,
      source: "justtcg".to_string(),
      updated_at: None,
    }
  }

  #[test]
  fn test_dedupe_keeps_last_per_key() {
    let entries = vec![
      entry("c1", Condition::NearMint, 1.0),
      entry("c1", Condition::LightlyPlayed, 2.0),
      entry("c1", Condition::NearMint, 3.0),
      entry("c2", Condition::NearMint, 4.0),
    ];

    let deduped = dedupe_by_key(&entries);

    assert_eq!(deduped.len(), 3);
    assert_eq!(deduped[0].price_usd, 3.0);
    assert_eq!(deduped[1].condition, Condition::LightlyPlayed);
    assert_eq!(deduped[2].card_id, "c2");
  }

  #[test]
  fn test_diesel_error_mapping() {
    let err: RepositoryError = DieselError::NotFound.into();
    assert!(matches!(err, RepositoryError::NotFound(_)));
  }
}
