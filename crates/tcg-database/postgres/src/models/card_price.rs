use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tcg_core::{Condition, Language, PriceEntry, Printing};

use crate::schema::card_prices;

/// A cached price row, unique on (card_id, condition, printing, language)
#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = card_prices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CardPrice {
  pub id: i64,
  pub card_id: String,
  pub condition: String,
  pub printing: String,
  pub language: String,
  pub price_usd: f64,
  pub source: String,
  pub updated_at: DateTime<Utc>,
}

impl CardPrice {
  /// None when the stored condition is not one the engine knows
  pub fn into_entry(self) -> Option<PriceEntry> {
    let condition = Condition::parse(&self.condition)?;
    Some(PriceEntry {
      card_id: self.card_id,
      condition,
      printing: Printing::parse(&self.printing).unwrap_or(Printing::Normal),
      language: Language::normalize(&self.language),
      price_usd: self.price_usd,
      source: self.source,
      updated_at: Some(self.updated_at),
    })
  }
}

/// Column-wise arrays for one bulk upsert statement
#[derive(Debug, Default)]
pub struct PriceColumns {
  pub card_ids: Vec<String>,
  pub conditions: Vec<String>,
  pub printings: Vec<String>,
  pub languages: Vec<String>,
  pub prices: Vec<f64>,
  pub sources: Vec<String>,
  pub updated_at: Vec<DateTime<Utc>>,
}

impl PriceColumns {
  /// Entries without a timestamp are stamped with `now`
  pub fn from_entries(entries: &[PriceEntry], now: DateTime<Utc>) -> Self {
    let mut cols = PriceColumns::default();
    for entry in entries {
      cols.card_ids.push(entry.card_id.clone());
      cols.conditions.push(entry.condition.as_str().to_string());
      cols.printings.push(entry.printing.as_str().to_string());
      cols.languages.push(entry.language.as_str().to_string());
      cols.prices.push(entry.price_usd);
      cols.sources.push(entry.source.clone());
      cols.updated_at.push(entry.updated_at.unwrap_or(now));
    }
    cols
  }

  pub fn len(&self) -> usize {
    self.card_ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.card_ids.is_empty()
  }
}
