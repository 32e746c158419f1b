//! Cards whose identifier discovery failed for a reason retrying cannot fix.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedReason {
  /// No translation to a provider set key
  UnknownSetMapping,
  /// The set listing was complete and the card was not in it
  NotFoundInSet,
}

impl UnmatchedReason {
  pub fn description(&self) -> &'static str {
    match self {
      UnmatchedReason::UnknownSetMapping => "Unknown set mapping",
      UnmatchedReason::NotFoundInSet => "Card not found in set data (checked by number and name)",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedCard {
  pub card_id: String,
  pub name: String,
  pub card_number: String,
  pub set_name: String,
  pub reason: UnmatchedReason,
  pub recorded_at: DateTime<Utc>,
}

/// Reader-heavy registry; status reads far outnumber writes
#[derive(Debug, Default)]
pub struct UnmatchedRegistry {
  cards: RwLock<Vec<UnmatchedCard>>,
}

impl UnmatchedRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a card, replacing an earlier entry for the same id. Returns true if it is new.
  pub fn record(&self, card: UnmatchedCard) -> bool {
    let mut cards = self.cards.write().unwrap_or_else(PoisonError::into_inner);
    match cards.iter_mut().find(|c| c.card_id == card.card_id) {
      Some(existing) => {
        *existing = card;
        false
      }
      None => {
        cards.push(card);
        true
      }
    }
  }

  pub fn remove(&self, card_id: &str) -> bool {
    let mut cards = self.cards.write().unwrap_or_else(PoisonError::into_inner);
    let before = cards.len();
    cards.retain(|c| c.card_id != card_id);
    cards.len() != before
  }

  /// Empty the registry, returning how many entries were dropped
  pub fn clear(&self) -> usize {
    let mut cards = self.cards.write().unwrap_or_else(PoisonError::into_inner);
    let count = cards.len();
    cards.clear();
    count
  }

  pub fn contains(&self, card_id: &str) -> bool {
    self.read().iter().any(|c| c.card_id == card_id)
  }

  pub fn list(&self) -> Vec<UnmatchedCard> {
    self.read().clone()
  }

  pub fn ids(&self) -> HashSet<String> {
    self.read().iter().map(|c| c.card_id.clone()).collect()
  }

  /// Entries for one set that failed because the card was absent from it
  pub fn not_found_in(&self, set_name: &str) -> Vec<UnmatchedCard> {
    self
      .read()
      .iter()
      .filter(|c| c.set_name == set_name && c.reason == UnmatchedReason::NotFoundInSet)
      .cloned()
      .collect()
  }

  pub fn len(&self) -> usize {
    self.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.read().is_empty()
  }

  fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<UnmatchedCard>> {
    self.cards.read().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(card_id: &str, set_name: &str, reason: UnmatchedReason) -> UnmatchedCard {
    UnmatchedCard {
      card_id: card_id.to_string(),
      name: "Pikachu".to_string(),
      card_number: "073/102".to_string(),
      set_name: set_name.to_string(),
      reason,
      recorded_at: Utc::now(),
    }
  }

  #[test]
  fn test_record_dedupes_by_card() {
    let registry = UnmatchedRegistry::new();
    assert!(registry.record(entry("c1", "foo-set", UnmatchedReason::UnknownSetMapping)));
    assert!(!registry.record(entry("c1", "foo-set", UnmatchedReason::NotFoundInSet)));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.list()[0].reason, UnmatchedReason::NotFoundInSet);
  }

  #[test]
  fn test_remove_and_clear() {
    let registry = UnmatchedRegistry::new();
    registry.record(entry("c1", "a", UnmatchedReason::NotFoundInSet));
    registry.record(entry("c2", "b", UnmatchedReason::NotFoundInSet));

    assert!(registry.remove("c1"));
    assert!(!registry.remove("c1"));
    assert!(!registry.contains("c1"));
    assert_eq!(registry.clear(), 1);
    assert!(registry.is_empty());
  }

  #[test]
  fn test_not_found_in_set_filter() {
    let registry = UnmatchedRegistry::new();
    registry.record(entry("c1", "a", UnmatchedReason::NotFoundInSet));
    registry.record(entry("c2", "a", UnmatchedReason::UnknownSetMapping));
    registry.record(entry("c3", "b", UnmatchedReason::NotFoundInSet));

    let hits = registry.not_found_in("a");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].card_id, "c1");
  }

  #[test]
  fn test_reason_descriptions() {
    assert_eq!(UnmatchedReason::UnknownSetMapping.description(), "Unknown set mapping");
    let json = serde_json::to_string(&UnmatchedReason::NotFoundInSet).unwrap();
    assert_eq!(json, "\"not_found_in_set\"");
  }
}
