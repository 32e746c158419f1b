//! Identifier discovery: page through a provider set listing and index it.

use crate::error::ResolveError;
use crate::normalize::{normalize_name, number_keys};
use crate::provider::PriceProvider;
use crate::set_mapping::SetKeyTranslator;
use std::collections::HashMap;
use std::sync::Arc;
use tcg_core::{CardRef, Error, ErrorKind};
use tcg_models::ProviderCard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bound on pages per set, in case the provider keeps reporting more
const MAX_SET_PAGES: usize = 50;

/// Provider identifiers for one set, keyed by card number and by name
#[derive(Debug, Clone, Default)]
pub struct SetIdentifierIndex {
  pub provider_set_key: String,
  by_number: HashMap<String, String>,
  by_name: HashMap<String, String>,
  pub cards_seen: usize,
  pub pages_fetched: usize,
  /// False when pagination stopped early; a miss then proves nothing
  pub complete: bool,
}

impl SetIdentifierIndex {
  pub fn new(provider_set_key: impl Into<String>) -> Self {
    Self { provider_set_key: provider_set_key.into(), ..Default::default() }
  }

  /// Index one listed card under every number key and its normalized name.
  /// The first card seen keeps a contested key.
  pub fn insert(&mut self, number: Option<&str>, name: &str, provider_id: &str) {
    self.cards_seen += 1;
    if provider_id.trim().is_empty() {
      return;
    }

    for key in number.map(number_keys).unwrap_or_default() {
      self.by_number.entry(key).or_insert_with(|| provider_id.to_string());
    }
    let name_key = normalize_name(name);
    if !name_key.is_empty() {
      self.by_name.entry(name_key).or_insert_with(|| provider_id.to_string());
    }
  }

  pub fn absorb(&mut self, cards: &[ProviderCard]) {
    for card in cards {
      match card.tcgplayer_id.as_deref() {
        Some(id) => self.insert(card.number.as_deref(), &card.name, id),
        None => {
          self.cards_seen += 1;
          debug!("listed card {:?} has no provider id", card.name);
        }
      }
    }
  }

  /// Number keys first, name last
  pub fn lookup(&self, card_number: &str, name: &str) -> Option<&str> {
    number_keys(card_number)
      .iter()
      .find_map(|key| self.by_number.get(key))
      .or_else(|| self.by_name.get(&normalize_name(name)))
      .map(String::as_str)
  }

  pub fn lookup_card(&self, card: &CardRef) -> Option<&str> {
    self.lookup(&card.card_number, &card.name)
  }

  pub fn is_empty(&self) -> bool {
    self.by_number.is_empty() && self.by_name.is_empty()
  }
}

/// Builds [`SetIdentifierIndex`]es from the provider's set listings
pub struct Resolver {
  provider: Arc<dyn PriceProvider>,
  translator: Arc<dyn SetKeyTranslator>,
}

impl Resolver {
  pub fn new(provider: Arc<dyn PriceProvider>, translator: Arc<dyn SetKeyTranslator>) -> Self {
    Self { provider, translator }
  }

  pub fn translate(&self, set_name: &str) -> Option<String> {
    self.translator.translate(set_name)
  }

  /// Page through the listing for `set_name`, one quota unit per page.
  ///
  /// No page is fetched once remaining quota drops to `reserve`, so callers
  /// with a request still to make can hold those units back.
  ///
  /// A failure on the first page is an error. A failure on a later page (quota
  /// spent, provider hiccup, shutdown) ends pagination and returns what was
  /// gathered with `complete = false`.
  pub async fn resolve_set(
    &self,
    set_name: &str,
    reserve: u32,
    cancel: &CancellationToken,
  ) -> Result<SetIdentifierIndex, ResolveError> {
    let provider_key = self
      .translator
      .translate(set_name)
      .ok_or_else(|| ResolveError::UnknownSetMapping { set_key: set_name.to_string() })?;

    let mut index = SetIdentifierIndex::new(&provider_key);
    let mut offset = 0usize;

    loop {
      if cancel.is_cancelled() {
        if index.pages_fetched == 0 {
          return Err(ResolveError::Cancelled);
        }
        info!("set {} pagination cancelled after {} pages", provider_key, index.pages_fetched);
        break;
      }
      if index.pages_fetched >= MAX_SET_PAGES {
        warn!("set {} still reports more after {} pages, stopping", provider_key, MAX_SET_PAGES);
        break;
      }

      let quota = self.provider.quota();
      if quota.remaining() <= reserve {
        if index.pages_fetched == 0 {
          return Err(ResolveError::Transient(Error::QuotaExhausted {
            resets_at: quota.reset_time(),
          }));
        }
        info!(
          "set {} paused after {} pages, holding {} requests back",
          provider_key, index.pages_fetched, reserve
        );
        break;
      }

      let page = match self.provider.fetch_set_page(&provider_key, offset, cancel).await {
        Ok(page) => page,
        Err(e) if index.pages_fetched == 0 => {
          return Err(match e.kind() {
            ErrorKind::Cancelled => ResolveError::Cancelled,
            _ => ResolveError::Transient(e),
          });
        }
        Err(e) => {
          warn!(
            "set {} stopped after {} pages, keeping partial index: {}",
            provider_key, index.pages_fetched, e
          );
          break;
        }
      };

      index.pages_fetched += 1;
      offset += page.cards.len();
      index.absorb(&page.cards);

      if !page.has_more || page.cards.is_empty() {
        index.complete = true;
        break;
      }
    }

    info!(
      "resolved set {} -> {}: {} cards over {} pages{}",
      set_name,
      provider_key,
      index.cards_seen,
      index.pages_fetched,
      if index.complete { "" } else { " (partial)" }
    );
    Ok(index)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::set_mapping::StaticSetTable;
  use crate::test_utils::{listed_card, FakeProvider};

  fn resolver(provider: Arc<FakeProvider>) -> Resolver {
    let table = StaticSetTable::from_pairs([("foo-set", "foo-set-pokemon")]);
    Resolver::new(provider, Arc::new(table))
  }

  #[test]
  fn test_index_lookup_number_then_name() {
    let mut index = SetIdentifierIndex::new("foo-set-pokemon");
    index.insert(Some("73"), "Pikachu", "PID1");
    index.insert(Some("074/102"), "Raichu", "PID2");
    index.insert(None, "Nidoran♀", "PID3");

    assert_eq!(index.lookup("073/102", "Wrong Name"), Some("PID1"));
    assert_eq!(index.lookup("74", "Raichu"), Some("PID2"));
    assert_eq!(index.lookup("999", "Nidoran ♀"), Some("PID3"));
    assert_eq!(index.lookup("999", "Mew"), None);
    assert_eq!(index.cards_seen, 3);
  }

  #[test]
  fn test_index_first_card_keeps_contested_key() {
    let mut index = SetIdentifierIndex::new("s");
    index.insert(Some("1"), "Energy", "A");
    index.insert(Some("2"), "Energy", "B");
    assert_eq!(index.lookup("", "Energy"), Some("A"));
  }

  #[tokio::test]
  async fn test_resolve_set_paginates_to_completion() {
    let provider = Arc::new(FakeProvider::new(100).with_page_size(2));
    provider.add_set(
      "foo-set-pokemon",
      vec![
        listed_card("1", "Bulbasaur", "P1"),
        listed_card("2", "Ivysaur", "P2"),
        listed_card("73", "Pikachu", "PID1"),
      ],
    );

    let index = resolver(provider.clone())
      .resolve_set("Foo Set", 0, &CancellationToken::new())
      .await
      .unwrap();

    assert!(index.complete);
    assert_eq!(index.pages_fetched, 2);
    assert_eq!(index.lookup("073/102", "Pikachu"), Some("PID1"));
    assert_eq!(provider.quota().remaining(), 98);
  }

  #[tokio::test]
  async fn test_unknown_set_spends_nothing() {
    let provider = Arc::new(FakeProvider::new(100));
    let err = resolver(provider.clone())
      .resolve_set("bar-set", 0, &CancellationToken::new())
      .await
      .unwrap_err();

    assert!(err.is_permanent());
    assert_eq!(provider.quota().remaining(), 100);
    assert_eq!(provider.set_page_calls(), 0);
  }

  #[tokio::test]
  async fn test_quota_exhausted_mid_set_keeps_partial_index() {
    let provider = Arc::new(FakeProvider::new(1).with_page_size(1));
    provider.add_set(
      "foo-set-pokemon",
      vec![listed_card("1", "Bulbasaur", "P1"), listed_card("2", "Ivysaur", "P2")],
    );

    let index =
      resolver(provider).resolve_set("foo-set", 0, &CancellationToken::new()).await.unwrap();

    assert!(!index.complete);
    assert_eq!(index.lookup("1", ""), Some("P1"));
    assert_eq!(index.lookup("2", "Ivysaur"), None);
  }

  #[tokio::test]
  async fn test_reserve_stops_pagination_early() {
    let provider = Arc::new(FakeProvider::new(2).with_page_size(1));
    provider.add_set(
      "foo-set-pokemon",
      vec![listed_card("1", "Bulbasaur", "P1"), listed_card("2", "Ivysaur", "P2")],
    );

    let index = resolver(provider.clone())
      .resolve_set("foo-set", 1, &CancellationToken::new())
      .await
      .unwrap();

    assert!(!index.complete);
    assert_eq!(index.pages_fetched, 1);
    assert_eq!(index.lookup("1", ""), Some("P1"));
    assert_eq!(provider.quota().remaining(), 1);
  }

  #[tokio::test]
  async fn test_reserve_blocks_first_page() {
    let provider = Arc::new(FakeProvider::new(1));
    provider.add_set("foo-set-pokemon", vec![listed_card("1", "Bulbasaur", "P1")]);

    let err = resolver(provider.clone())
      .resolve_set("foo-set", 1, &CancellationToken::new())
      .await
      .unwrap_err();

    assert!(matches!(err, ResolveError::Transient(Error::QuotaExhausted { .. })));
    assert_eq!(provider.set_page_calls(), 0);
    assert_eq!(provider.quota().remaining(), 1);
  }

  #[tokio::test]
  async fn test_first_page_failure_is_transient() {
    let provider = Arc::new(FakeProvider::new(100));
    provider.add_set("foo-set-pokemon", vec![listed_card("1", "Bulbasaur", "P1")]);
    provider.fail_set("foo-set-pokemon");

    let err =
      resolver(provider).resolve_set("foo-set", 0, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, ResolveError::Transient(_)));
    assert!(!err.is_permanent());
  }

  #[tokio::test]
  async fn test_cancelled_before_first_page() {
    let provider = Arc::new(FakeProvider::new(100));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = resolver(provider).resolve_set("foo-set", 0, &cancel).await.unwrap_err();
    assert!(matches!(err, ResolveError::Cancelled));
  }
}
