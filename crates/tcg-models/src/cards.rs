//! Card listing and batch lookup payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::string_or_number;

/// A card as returned by search, batch and set listing endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCard {
  /// Provider's slug id for the card (not the pricing identifier)
  #[serde(default)]
  pub id: String,

  pub name: String,

  #[serde(default)]
  pub game: Option<String>,

  /// Provider set key, e.g. `base-set-pokemon`
  #[serde(default)]
  pub set: Option<String>,

  #[serde(default, rename = "set_name")]
  pub set_name: Option<String>,

  /// Number within the set, sometimes with a `/total` suffix
  #[serde(default, deserialize_with = "string_or_number")]
  pub number: Option<String>,

  /// Provider-native pricing identifier
  #[serde(default, deserialize_with = "string_or_number")]
  pub tcgplayer_id: Option<String>,

  /// Second-namespace identifier used by Magic cards
  #[serde(default, deserialize_with = "string_or_number")]
  pub scryfall_id: Option<String>,

  #[serde(default)]
  pub rarity: Option<String>,

  #[serde(default)]
  pub variants: Vec<ProviderVariant>,
}

/// One condition/printing/language price point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderVariant {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub condition: String,
  #[serde(default)]
  pub printing: String,
  #[serde(default)]
  pub language: Option<String>,
  /// Missing when the variant has no listings
  #[serde(default)]
  pub price: Option<f64>,
  /// Unix seconds of the provider's last observation
  #[serde(default)]
  pub last_updated: Option<i64>,
}

impl ProviderVariant {
  pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
    self.last_updated.and_then(|secs| DateTime::from_timestamp(secs, 0))
  }
}

/// One element of the batched lookup request body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardBatchItem {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tcgplayer_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub scryfall_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub game: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::common::ApiResponse;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_card_with_numeric_ids() {
    let json = r#"{
      "id": "pokemon-base-set-charizard-holo-rare",
      "name": "Charizard",
      "game": "Pokemon",
      "set": "base-set-pokemon",
      "set_name": "Base Set",
      "number": "004/102",
      "tcgplayerId": 42382,
      "rarity": "Holo Rare",
      "variants": [
        {"id": "v1", "condition": "Near Mint", "printing": "Holofoil", "language": "English", "price": 350.25, "lastUpdated": 1735689600},
        {"id": "v2", "condition": "Damaged", "printing": "Holofoil", "price": null}
      ]
    }"#;

    let card: ProviderCard = serde_json::from_str(json).unwrap();
    assert_eq!(card.tcgplayer_id.as_deref(), Some("42382"));
    assert_eq!(card.number.as_deref(), Some("004/102"));
    assert_eq!(card.scryfall_id, None);
    assert_eq!(card.variants.len(), 2);
    assert_eq!(card.variants[0].price, Some(350.25));
    assert!(card.variants[0].last_updated_at().is_some());
    assert_eq!(card.variants[1].price, None);
  }

  #[test]
  fn test_listing_page() {
    let json = r#"{
      "data": [{"name": "Pikachu", "number": 58, "tcgplayerId": "1001"}],
      "meta": {"total": 102, "limit": 1, "offset": 0, "hasMore": true}
    }"#;
    let page: ApiResponse<Vec<ProviderCard>> = serde_json::from_str(json).unwrap();
    let cards = page.data.clone().unwrap();
    assert_eq!(cards[0].number.as_deref(), Some("58"));
    assert!(page.has_more());
  }

  #[test]
  fn test_batch_item_serialization_skips_empty_ids() {
    let item = CardBatchItem {
      tcgplayer_id: Some("42382".to_string()),
      scryfall_id: None,
      game: Some("pokemon".to_string()),
    };
    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json, serde_json::json!({"tcgplayerId": "42382", "game": "pokemon"}));
  }
}
