//! Provider vocabulary to closed enums.
//!
//! Conditions the engine does not know are dropped; an unknown printing is
//! treated as `Normal`; non-positive or missing prices mean "no listing".

use chrono::{DateTime, Utc};
use tcg_core::{Condition, Language, PriceEntry, Printing, PROVIDER_SOURCE};
use tcg_models::ProviderVariant;
use tracing::trace;

pub fn map_condition(raw: &str) -> Option<Condition> {
  Condition::parse(raw)
}

pub fn map_printing(raw: &str) -> Printing {
  Printing::parse(raw).unwrap_or(Printing::Normal)
}

pub fn map_language(raw: Option<&str>) -> Language {
  raw.map(Language::normalize).unwrap_or_default()
}

/// Convert provider variants into price entries for `card_id`, stamped at `fetched_at`
pub fn variants_to_prices(
  card_id: &str,
  variants: &[ProviderVariant],
  fetched_at: DateTime<Utc>,
) -> Vec<PriceEntry> {
  variants
    .iter()
    .filter_map(|v| {
      let Some(condition) = map_condition(&v.condition) else {
        trace!("dropping variant with unknown condition {:?}", v.condition);
        return None;
      };
      let price = v.price.filter(|p| p.is_finite() && *p > 0.0)?;

      Some(PriceEntry {
        card_id: card_id.to_string(),
        condition,
        printing: map_printing(&v.printing),
        language: map_language(v.language.as_deref()),
        price_usd: price,
        source: PROVIDER_SOURCE.to_string(),
        updated_at: Some(fetched_at),
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn variant(condition: &str, printing: &str, price: Option<f64>) -> ProviderVariant {
    ProviderVariant {
      id: None,
      condition: condition.to_string(),
      printing: printing.to_string(),
      language: None,
      price,
      last_updated: None,
    }
  }

  #[test]
  fn test_unknown_condition_is_dropped() {
    let prices = variants_to_prices(
      "c1",
      &[variant("Sealed", "Normal", Some(5.0)), variant("Near Mint", "Normal", Some(4.0))],
      Utc::now(),
    );
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0].condition, Condition::NearMint);
  }

  #[test]
  fn test_unknown_printing_defaults_to_normal() {
    let prices = variants_to_prices("c1", &[variant("LP", "Etched Foil", Some(3.0))], Utc::now());
    assert_eq!(prices[0].printing, Printing::Normal);
  }

  #[test]
  fn test_non_positive_prices_are_dropped() {
    let prices = variants_to_prices(
      "c1",
      &[
        variant("NM", "Normal", Some(0.0)),
        variant("NM", "Foil", Some(-2.0)),
        variant("LP", "Normal", None),
        variant("MP", "Reverse Holofoil", Some(1.25)),
      ],
      Utc::now(),
    );
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0].printing, Printing::ReverseHolo);
    assert_eq!(prices[0].source, "justtcg");
  }

  #[test]
  fn test_language_mapping() {
    let mut v = variant("NM", "Normal", Some(2.0));
    v.language = Some("Japanese".to_string());
    let prices = variants_to_prices("c1", &[v], Utc::now());
    assert_eq!(prices[0].language, Language::Japanese);
    assert_eq!(map_language(None), Language::English);
  }
}
