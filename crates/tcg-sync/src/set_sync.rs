//! Admin-triggered identifier discovery, outside the price cycle.

use crate::error::{ResolveError, SyncError, SyncResult};
use crate::provider::PriceProvider;
use crate::resolver::Resolver;
use crate::set_mapping::SetKeyTranslator;
use crate::unmatched::UnmatchedRegistry;
use crate::{BATCH_QUOTA_RESERVE, MIN_SET_SYNC_QUOTA};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tcg_core::{CardRef, Game};
use tcg_database_postgres::{CardRepository, MissingIdFilter};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SetSyncResult {
  pub sets_processed: usize,
  pub cards_updated: usize,
  pub cards_skipped: usize,
  pub errors: Vec<String>,
  pub duration: Duration,
  pub requests_used: u32,
  pub quota_remaining: u32,
}

pub struct SetSyncService {
  provider: Arc<dyn PriceProvider>,
  cards: Arc<dyn CardRepository>,
  resolver: Resolver,
  unmatched: Option<Arc<UnmatchedRegistry>>,
  running: AtomicBool,
}

/// Clears the running flag however the sync ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::SeqCst);
  }
}

impl SetSyncService {
  pub fn new(
    provider: Arc<dyn PriceProvider>,
    cards: Arc<dyn CardRepository>,
    translator: Arc<dyn SetKeyTranslator>,
  ) -> Self {
    Self {
      resolver: Resolver::new(Arc::clone(&provider), translator),
      provider,
      cards,
      unmatched: None,
      running: AtomicBool::new(false),
    }
  }

  /// Share the worker's registry so resolved cards leave it
  pub fn with_unmatched(mut self, unmatched: Arc<UnmatchedRegistry>) -> Self {
    self.unmatched = Some(unmatched);
    self
  }

  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::SeqCst)
  }

  /// Discover identifiers for every collection card lacking one, set by set.
  ///
  /// Returns `None` when a sync is already running. Stops early, keeping what
  /// it found, when cancelled or when fewer than two quota units remain.
  pub async fn sync_missing(
    &self,
    cancel: &CancellationToken,
  ) -> SyncResult<Option<SetSyncResult>> {
    if self.running.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
      info!("set sync already running");
      return Ok(None);
    }
    let _guard = RunningGuard(&self.running);

    let started = Instant::now();
    let quota = self.provider.quota();
    let used_before = quota.snapshot().used_today;
    let mut result = SetSyncResult::default();

    let mut by_set: BTreeMap<String, Vec<CardRef>> = BTreeMap::new();
    for game in [Game::Pokemon, Game::Mtg].into_iter().filter(Game::needs_provider_id) {
      for card in self.cards.cards_missing_provider_id(&MissingIdFilter::collection(game)).await? {
        by_set.entry(card.set_key().to_string()).or_default().push(card);
      }
    }
    info!("set sync: {} sets with cards missing identifiers", by_set.len());

    for (set_name, cards) in by_set {
      if cancel.is_cancelled() {
        result.errors.push("sync cancelled".to_string());
        break;
      }
      if quota.remaining() < MIN_SET_SYNC_QUOTA {
        result.errors.push("quota exhausted, stopping early".to_string());
        break;
      }

      match self.resolver.resolve_set(&set_name, BATCH_QUOTA_RESERVE, cancel).await {
        Ok(index) => {
          result.sets_processed += 1;
          for card in &cards {
            match index.lookup_card(card) {
              Some(provider_id) => {
                if self.cards.set_provider_id(&card.id, provider_id).await? {
                  result.cards_updated += 1;
                }
                if let Some(unmatched) = &self.unmatched {
                  unmatched.remove(&card.id);
                }
              }
              None => result.cards_skipped += 1,
            }
          }
        }
        Err(ResolveError::UnknownSetMapping { .. }) => {
          warn!("no provider mapping for set {:?}, skipping {} cards", set_name, cards.len());
          result.cards_skipped += cards.len();
        }
        Err(ResolveError::Cancelled) => {
          result.errors.push("sync cancelled".to_string());
          result.cards_skipped += cards.len();
          break;
        }
        Err(e) => {
          warn!("set {:?} failed: {}", set_name, e);
          result.errors.push(format!("{}: {}", set_name, e));
          result.cards_skipped += cards.len();
        }
      }
    }

    self.finish(&mut result, started, used_before);
    info!(
      "set sync done: {} sets, {} cards updated, {} skipped, {} errors in {:?}",
      result.sets_processed,
      result.cards_updated,
      result.cards_skipped,
      result.errors.len(),
      result.duration
    );
    Ok(Some(result))
  }

  /// Discover identifiers for one set, including cards outside any collection
  pub async fn sync_set(
    &self,
    set_name: &str,
    cancel: &CancellationToken,
  ) -> SyncResult<SetSyncResult> {
    let started = Instant::now();
    let quota = self.provider.quota();
    let used_before = quota.snapshot().used_today;
    let mut result = SetSyncResult::default();

    let filter = MissingIdFilter::set(Game::Pokemon, set_name);
    let cards = self.cards.cards_missing_provider_id(&filter).await?;
    if cards.is_empty() {
      info!("set {:?}: no cards missing identifiers", set_name);
      self.finish(&mut result, started, used_before);
      return Ok(result);
    }

    let index = match self.resolver.resolve_set(set_name, BATCH_QUOTA_RESERVE, cancel).await {
      Ok(index) => index,
      Err(ResolveError::UnknownSetMapping { .. }) => {
        result.errors.push(format!("unknown set: {}", set_name));
        result.cards_skipped = cards.len();
        self.finish(&mut result, started, used_before);
        return Ok(result);
      }
      Err(ResolveError::Cancelled) => return Err(SyncError::Cancelled),
      Err(ResolveError::Transient(e)) => return Err(SyncError::from_api(e)),
    };

    result.sets_processed = 1;
    for card in &cards {
      match index.lookup_card(card) {
        Some(provider_id) => {
          if self.cards.set_provider_id(&card.id, provider_id).await? {
            result.cards_updated += 1;
          }
          if let Some(unmatched) = &self.unmatched {
            unmatched.remove(&card.id);
          }
        }
        None => result.cards_skipped += 1,
      }
    }

    self.finish(&mut result, started, used_before);
    info!(
      "set {:?}: {} updated, {} skipped, {} requests",
      set_name, result.cards_updated, result.cards_skipped, result.requests_used
    );
    Ok(result)
  }

  fn finish(&self, result: &mut SetSyncResult, started: Instant, used_before: u32) {
    let quota = self.provider.quota().snapshot();
    result.duration = started.elapsed();
    result.requests_used = quota.used_today.saturating_sub(used_before);
    result.quota_remaining = quota.remaining;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::set_mapping::StaticSetTable;
  use crate::test_utils::{listed_card, pokemon_card, FakeProvider, MemoryStore};

  fn service(provider: Arc<FakeProvider>, store: Arc<MemoryStore>) -> SetSyncService {
    let table =
      StaticSetTable::from_pairs([("foo-set", "foo-set-pokemon"), ("baz-set", "baz-set-pokemon")]);
    SetSyncService::new(provider, store, Arc::new(table))
  }

  #[tokio::test]
  async fn test_sync_missing_updates_and_skips() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(FakeProvider::new(100));
    store.add_card(pokemon_card("c1", "Pikachu", "foo-set", "073/102"), true);
    store.add_card(pokemon_card("c2", "Mew", "foo-set", "151"), true);
    store.add_card(pokemon_card("c3", "Eevee", "bar-set", "1"), true);
    store.add_card(pokemon_card("c4", "Ditto", "foo-set", "132"), false);
    provider.add_set("foo-set-pokemon", vec![listed_card("73", "Pikachu", "PID1")]);

    let result = service(provider, store.clone())
      .sync_missing(&CancellationToken::new())
      .await
      .unwrap()
      .unwrap();

    assert_eq!(result.sets_processed, 1);
    assert_eq!(result.cards_updated, 1);
    assert_eq!(result.cards_skipped, 2);
    assert_eq!(result.requests_used, 1);
    assert_eq!(result.quota_remaining, 99);
    assert!(result.errors.is_empty());
    assert_eq!(store.card("c1").unwrap().provider_id.as_deref(), Some("PID1"));
  }

  #[tokio::test]
  async fn test_sync_missing_stops_on_low_quota() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(FakeProvider::new(1));
    store.add_card(pokemon_card("c1", "Pikachu", "foo-set", "73"), true);

    let result =
      service(provider, store).sync_missing(&CancellationToken::new()).await.unwrap().unwrap();

    assert_eq!(result.errors, vec!["quota exhausted, stopping early".to_string()]);
    assert_eq!(result.sets_processed, 0);
  }

  #[tokio::test]
  async fn test_sync_missing_cancelled() {
    let store = Arc::new(MemoryStore::new());
    store.add_card(pokemon_card("c1", "Pikachu", "foo-set", "73"), true);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result =
      service(Arc::new(FakeProvider::new(100)), store).sync_missing(&cancel).await.unwrap().unwrap();
    assert_eq!(result.errors, vec!["sync cancelled".to_string()]);
  }

  #[tokio::test]
  async fn test_sync_missing_rejects_concurrent_run() {
    let store = Arc::new(MemoryStore::new());
    let svc = service(Arc::new(FakeProvider::new(100)), store);

    svc.running.store(true, Ordering::SeqCst);
    assert!(svc.sync_missing(&CancellationToken::new()).await.unwrap().is_none());

    svc.running.store(false, Ordering::SeqCst);
    assert!(svc.sync_missing(&CancellationToken::new()).await.unwrap().is_some());
    assert!(!svc.is_running());
  }

  #[tokio::test]
  async fn test_sync_set_includes_cards_outside_collection() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(FakeProvider::new(100));
    store.add_card(pokemon_card("c4", "Ditto", "baz-set", "132"), false);
    provider.add_set("baz-set-pokemon", vec![listed_card("132", "Ditto", "PID132")]);

    let registry = Arc::new(UnmatchedRegistry::new());
    let svc = service(provider, store.clone()).with_unmatched(registry);
    let result = svc.sync_set("baz-set", &CancellationToken::new()).await.unwrap();

    assert_eq!(result.cards_updated, 1);
    assert_eq!(store.card("c4").unwrap().provider_id.as_deref(), Some("PID132"));
  }

  #[tokio::test]
  async fn test_sync_set_unknown() {
    let store = Arc::new(MemoryStore::new());
    store.add_card(pokemon_card("c3", "Eevee", "bar-set", "1"), true);

    let result = service(Arc::new(FakeProvider::new(100)), store)
      .sync_set("bar-set", &CancellationToken::new())
      .await
      .unwrap();

    assert_eq!(result.errors, vec!["unknown set: bar-set".to_string()]);
    assert_eq!(result.cards_skipped, 1);
    assert_eq!(result.requests_used, 0);
  }
}
