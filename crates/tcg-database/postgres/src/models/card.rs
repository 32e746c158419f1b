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

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tcg_core::{CardRef, Game};

use crate::repository::{RepositoryError, RepositoryResult};
use crate::schema::cards;

/// A row of the cards table
#[derive(Queryable, Selectable, QueryableByName, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = cards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Card {
  pub id: String,
  pub game: String,
  pub name: String,
  pub set_name: String,
  pub set_code: String,
  pub card_number: String,
  pub provider_id: Option<String>,
  pub price_usd: Option<f64>,
  pub price_foil_usd: Option<f64>,
  pub price_source: Option<String>,
  pub price_updated_at: Option<DateTime<Utc>>,
  pub last_price_check: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Card {
  /// Convert to the engine's view of a card
  pub fn into_card_ref(self) -> RepositoryResult<CardRef> {
    let game = Game::from_code(&self.game).ok_or_else(|| {
      let msg = format!("card {} has unknown game {:?}", self.id, self.game);
      RepositoryError::SerializationError(msg)
    })?;

    Ok(CardRef {
      id: self.id,
      game,
      name: self.name,
      set_name: self.set_name,
      set_code: self.set_code,
      card_number: self.card_number,
      provider_id: self.provider_id.filter(|id| !id.trim().is_empty()),
      price_usd: self.price_usd.unwrap_or(0.0),
      price_foil_usd: self.price_foil_usd.unwrap_or(0.0),
      price_source: self.price_source,
      price_updated_at: self.price_updated_at,
      last_price_check: self.last_price_check,
    })
  }
}

/// Convert loaded rows, skipping any whose game this engine does not price
pub fn into_card_refs(rows: Vec<Card>) -> Vec<CardRef> {
  rows
    .into_iter()
    .filter_map(|row| match row.into_card_ref() {
      Ok(card) => Some(card),
      Err(e) => {
        log::warn!("Skipping card row: {}", e);
        None
      }
    })
    .collect()
}

/// Pricing columns written back after a sync
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = cards)]
pub struct CardPricingUpdate {
  pub price_usd: Option<f64>,
  pub price_foil_usd: Option<f64>,
  pub price_source: Option<String>,
  pub price_updated_at: Option<DateTime<Utc>>,
  pub last_price_check: Option<DateTime<Utc>>,
  pub updated_at: DateTime<Utc>,
}

impl CardPricingUpdate {
  pub fn from_card(card: &CardRef, now: DateTime<Utc>) -> Self {
    Self {
      price_usd: (card.price_usd > 0.0).then_some(card.price_usd),
      price_foil_usd: (card.price_foil_usd > 0.0).then_some(card.price_foil_usd),
      price_source: card.price_source.clone(),
      price_updated_at: card.price_updated_at,
      last_price_check: card.last_price_check,
      updated_at: now,
    }
  }
}
