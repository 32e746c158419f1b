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

//! Card and price vocabulary.
//!
//! Conditions, printings and languages are closed enums. Provider strings are
//! mapped onto them by the client; the database stores the `as_str()` codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Card game families the engine prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Game {
  Pokemon,
  Mtg,
}

impl Game {
  pub fn as_str(&self) -> &'static str {
    match self {
      Game::Pokemon => "pokemon",
      Game::Mtg => "mtg",
    }
  }

  /// Game slug the provider expects in requests
  pub fn provider_slug(&self) -> &'static str {
    match self {
      Game::Pokemon => "pokemon",
      Game::Mtg => "magic-the-gathering",
    }
  }

  /// Games priced through the provider's own identifier, discovered by set sync.
  /// Other games carry an alternate identifier from the start.
  pub fn needs_provider_id(&self) -> bool {
    matches!(self, Game::Pokemon)
  }

  pub fn from_code(code: &str) -> Option<Self> {
    match code.trim().to_lowercase().as_str() {
      "pokemon" => Some(Game::Pokemon),
      "mtg" | "magic" | "magic-the-gathering" => Some(Game::Mtg),
      _ => None,
    }
  }
}

impl fmt::Display for Game {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Condition {
  #[serde(rename = "NM")]
  NearMint,
  #[serde(rename = "LP")]
  LightlyPlayed,
  #[serde(rename = "MP")]
  ModeratelyPlayed,
  #[serde(rename = "HP")]
  HeavilyPlayed,
  #[serde(rename = "DMG")]
  Damaged,
}

impl Condition {
  pub const ALL: [Condition; 5] = [
    Condition::NearMint,
    Condition::LightlyPlayed,
    Condition::ModeratelyPlayed,
    Condition::HeavilyPlayed,
    Condition::Damaged,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Condition::NearMint => "NM",
      Condition::LightlyPlayed => "LP",
      Condition::ModeratelyPlayed => "MP",
      Condition::HeavilyPlayed => "HP",
      Condition::Damaged => "DMG",
    }
  }

  /// Parse a stored code or a provider label. Unknown text yields `None`.
  pub fn parse(raw: &str) -> Option<Self> {
    match raw.trim().to_lowercase().as_str() {
      "nm" | "near mint" => Some(Condition::NearMint),
      "lp" | "lightly played" => Some(Condition::LightlyPlayed),
      "mp" | "moderately played" => Some(Condition::ModeratelyPlayed),
      "hp" | "heavily played" => Some(Condition::HeavilyPlayed),
      "dmg" | "damaged" => Some(Condition::Damaged),
      _ => None,
    }
  }
}

impl fmt::Display for Condition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Printing variant (finish) of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Printing {
  #[serde(rename = "Normal")]
  Normal,
  #[serde(rename = "Foil")]
  Foil,
  #[serde(rename = "1st Edition")]
  FirstEdition,
  #[serde(rename = "Unlimited")]
  Unlimited,
  #[serde(rename = "Reverse Holofoil")]
  ReverseHolo,
}

impl Printing {
  pub const ALL: [Printing; 5] = [
    Printing::Normal,
    Printing::Foil,
    Printing::FirstEdition,
    Printing::Unlimited,
    Printing::ReverseHolo,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Printing::Normal => "Normal",
      Printing::Foil => "Foil",
      Printing::FirstEdition => "1st Edition",
      Printing::Unlimited => "Unlimited",
      Printing::ReverseHolo => "Reverse Holofoil",
    }
  }

  /// True for holographic finishes. 1st Edition is a print run, not a foil.
  pub fn is_foil(&self) -> bool {
    matches!(self, Printing::Foil | Printing::ReverseHolo)
  }

  /// Parse a stored code or a provider label. Unknown text yields `None`;
  /// callers decide whether that means `Normal`.
  pub fn parse(raw: &str) -> Option<Self> {
    match raw.trim().to_lowercase().as_str() {
      "normal" => Some(Printing::Normal),
      "foil" | "holo" | "holofoil" => Some(Printing::Foil),
      "1st edition" | "first edition" | "1st_edition" => Some(Printing::FirstEdition),
      "unlimited" => Some(Printing::Unlimited),
      "reverse holofoil" | "reverse holo" | "reverse" | "reverse_holo" => {
        Some(Printing::ReverseHolo)
      }
      _ => None,
    }
  }
}

impl fmt::Display for Printing {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Language {
  #[default]
  English,
  Japanese,
  German,
  French,
  Italian,
  Spanish,
  Portuguese,
  Korean,
  Chinese,
}

impl Language {
  pub fn as_str(&self) -> &'static str {
    match self {
      Language::English => "English",
      Language::Japanese => "Japanese",
      Language::German => "German",
      Language::French => "French",
      Language::Italian => "Italian",
      Language::Spanish => "Spanish",
      Language::Portuguese => "Portuguese",
      Language::Korean => "Korean",
      Language::Chinese => "Chinese",
    }
  }

  /// Map names, ISO codes and common variants. Empty or unknown is English.
  pub fn normalize(raw: &str) -> Self {
    match raw.trim().to_lowercase().as_str() {
      "japanese" | "jp" | "ja" | "jpn" => Language::Japanese,
      "german" | "de" | "deu" | "ger" => Language::German,
      "french" | "fr" | "fra" | "fre" => Language::French,
      "italian" | "it" | "ita" => Language::Italian,
      "spanish" | "es" | "spa" => Language::Spanish,
      "portuguese" | "pt" | "por" => Language::Portuguese,
      "korean" | "ko" | "kor" => Language::Korean,
      "chinese" | "zh" | "chi" | "zho" | "chinese (simplified)" | "chinese (traditional)" => {
        Language::Chinese
      }
      _ => Language::English,
    }
  }
}

impl fmt::Display for Language {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// One cached price, unique on (card_id, condition, printing, language)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
  pub card_id: String,
  pub condition: Condition,
  pub printing: Printing,
  pub language: Language,
  pub price_usd: f64,
  pub source: String,
  pub updated_at: Option<DateTime<Utc>>,
}

impl PriceEntry {
  pub fn key(&self) -> (&str, Condition, Printing, Language) {
    (&self.card_id, self.condition, self.printing, self.language)
  }
}

/// The slice of a card record this engine reads and writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRef {
  pub id: String,
  pub game: Game,
  pub name: String,
  pub set_name: String,
  pub set_code: String,
  pub card_number: String,
  /// Provider-native identifier, empty until discovered
  pub provider_id: Option<String>,
  pub price_usd: f64,
  pub price_foil_usd: f64,
  pub price_source: Option<String>,
  pub price_updated_at: Option<DateTime<Utc>>,
  pub last_price_check: Option<DateTime<Utc>>,
}

impl CardRef {
  /// Set name used for grouping and translation, falling back to the set code
  pub fn set_key(&self) -> &str {
    if self.set_name.trim().is_empty() {
      &self.set_code
    } else {
      &self.set_name
    }
  }

  pub fn has_provider_id(&self) -> bool {
    self.provider_id.as_deref().is_some_and(|id| !id.trim().is_empty())
  }

  /// Identifier in the second namespace. Mtg card ids are Scryfall ids.
  pub fn alternate_id(&self) -> Option<&str> {
    match self.game {
      Game::Mtg => Some(self.id.as_str()),
      Game::Pokemon => None,
    }
  }

  /// True when a lookup can be built without set discovery
  pub fn has_lookup_identifier(&self) -> bool {
    self.has_provider_id() || self.alternate_id().is_some()
  }

  /// Record a discovered provider identifier. An existing identifier is never replaced.
  pub fn assign_provider_id(&mut self, provider_id: &str) -> bool {
    if self.has_provider_id() || provider_id.trim().is_empty() {
      return false;
    }
    self.provider_id = Some(provider_id.to_string());
    true
  }

  /// Price of last resort from the card's own fields
  pub fn base_price(&self, printing: Printing) -> Option<f64> {
    if printing.is_foil() && self.price_foil_usd > 0.0 {
      return Some(self.price_foil_usd);
    }
    (self.price_usd > 0.0).then_some(self.price_usd)
  }

  /// Mirror fetched NM prices onto the base fields and stamp the check time.
  ///
  /// The update timestamp moves whenever any price came back, even if none of
  /// them was NM, so the card is not re-selected as never-priced next cycle.
  /// English rows win over other languages for the mirrored value.
  pub fn apply_prices(&mut self, prices: &[PriceEntry], now: DateTime<Utc>) -> bool {
    if prices.is_empty() {
      return false;
    }

    let pick = |foil: bool| {
      let nm = |p: &&PriceEntry| p.condition == Condition::NearMint && p.printing.is_foil() == foil;
      prices
        .iter()
        .filter(nm)
        .find(|p| p.language == Language::English)
        .or_else(|| prices.iter().find(nm))
    };

    if let Some(normal) = pick(false) {
      self.price_usd = normal.price_usd;
      self.price_source = Some(normal.source.clone());
    }
    if let Some(foil) = pick(true) {
      self.price_foil_usd = foil.price_usd;
      self.price_source = Some(foil.source.clone());
    }

    self.price_updated_at = Some(now);
    self.last_price_check = Some(now);
    true
  }
}

/// A single lookup inside one batched provider call. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
  pub card_id: String,
  pub game: Game,
  pub provider_id: Option<String>,
  pub alternate_id: Option<String>,
  pub name: String,
  pub set_key: Option<String>,
}

impl LookupRequest {
  pub fn from_card(card: &CardRef) -> Self {
    let set_key = card.set_key();
    Self {
      card_id: card.id.clone(),
      game: card.game,
      provider_id: card.provider_id.clone().filter(|id| !id.trim().is_empty()),
      alternate_id: card.alternate_id().map(str::to_string),
      name: card.name.clone(),
      set_key: (!set_key.is_empty()).then(|| set_key.to_string()),
    }
  }

  pub fn has_identifier(&self) -> bool {
    self.provider_id.is_some() || self.alternate_id.is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  pub(crate) fn card(id: &str, game: Game) -> CardRef {
    CardRef {
      id: id.to_string(),
      game,
      name: "Charizard".to_string(),
      set_name: "Base Set".to_string(),
      set_code: "base1".to_string(),
      card_number: "4/102".to_string(),
      provider_id: None,
      price_usd: 0.0,
      price_foil_usd: 0.0,
      price_source: None,
      price_updated_at: None,
      last_price_check: None,
    }
  }

  fn price(condition: Condition, printing: Printing, language: Language, amount: f64) -> PriceEntry {
    PriceEntry {
      card_id: "c1".to_string(),
      condition,
      printing,
      language,
      price_usd: amount,
      source: "justtcg".to_string(),
      updated_at: None,
    }
  }

  #[test]
  fn test_condition_parse() {
    assert_eq!(Condition::parse("Near Mint"), Some(Condition::NearMint));
    assert_eq!(Condition::parse("lp"), Some(Condition::LightlyPlayed));
    assert_eq!(Condition::parse(" DMG "), Some(Condition::Damaged));
    assert_eq!(Condition::parse("Sealed"), None);
  }

  #[test]
  fn test_printing_parse_and_foil() {
    assert_eq!(Printing::parse("Reverse Holofoil"), Some(Printing::ReverseHolo));
    assert_eq!(Printing::parse("holofoil"), Some(Printing::Foil));
    assert_eq!(Printing::parse("First Edition"), Some(Printing::FirstEdition));
    assert_eq!(Printing::parse("Etched"), None);
    assert!(Printing::ReverseHolo.is_foil());
    assert!(!Printing::FirstEdition.is_foil());
  }

  #[test]
  fn test_language_normalize() {
    assert_eq!(Language::normalize("ja"), Language::Japanese);
    assert_eq!(Language::normalize("German"), Language::German);
    assert_eq!(Language::normalize(""), Language::English);
    assert_eq!(Language::normalize("Klingon"), Language::English);
  }

  #[test]
  fn test_game_codes() {
    assert_eq!(Game::from_code("MTG"), Some(Game::Mtg));
    assert_eq!(Game::Mtg.provider_slug(), "magic-the-gathering");
    assert!(Game::Pokemon.needs_provider_id());
    assert!(!Game::Mtg.needs_provider_id());
  }

  #[test]
  fn test_base_price_prefers_foil_for_foil_variants() {
    let mut c = card("c1", Game::Pokemon);
    c.price_usd = 2.0;
    c.price_foil_usd = 9.0;
    assert_eq!(c.base_price(Printing::ReverseHolo), Some(9.0));
    assert_eq!(c.base_price(Printing::FirstEdition), Some(2.0));

    c.price_foil_usd = 0.0;
    assert_eq!(c.base_price(Printing::Foil), Some(2.0));

    c.price_usd = 0.0;
    assert_eq!(c.base_price(Printing::Normal), None);
  }

  #[test]
  fn test_assign_provider_id_never_overwrites() {
    let mut c = card("c1", Game::Pokemon);
    assert!(c.assign_provider_id("PID1"));
    assert!(!c.assign_provider_id("PID2"));
    assert_eq!(c.provider_id.as_deref(), Some("PID1"));
  }

  #[test]
  fn test_apply_prices_mirrors_nm() {
    let mut c = card("c1", Game::Pokemon);
    let now = Utc::now();
    let prices = vec![
      price(Condition::LightlyPlayed, Printing::Normal, Language::English, 3.0),
      price(Condition::NearMint, Printing::Normal, Language::Japanese, 7.0),
      price(Condition::NearMint, Printing::Normal, Language::English, 5.0),
      price(Condition::NearMint, Printing::ReverseHolo, Language::English, 11.0),
    ];

    assert!(c.apply_prices(&prices, now));
    assert_eq!(c.price_usd, 5.0);
    assert_eq!(c.price_foil_usd, 11.0);
    assert_eq!(c.price_updated_at, Some(now));
  }

  #[test]
  fn test_apply_prices_stamps_without_nm() {
    let mut c = card("c1", Game::Pokemon);
    c.price_usd = 1.5;
    let now = Utc::now();
    let prices = vec![price(Condition::HeavilyPlayed, Printing::Normal, Language::English, 0.5)];

    assert!(c.apply_prices(&prices, now));
    assert_eq!(c.price_usd, 1.5);
    assert_eq!(c.price_updated_at, Some(now));
    assert!(!c.apply_prices(&[], now));
  }

  #[test]
  fn test_lookup_request_identifiers() {
    let pokemon = card("c1", Game::Pokemon);
    let lookup = LookupRequest::from_card(&pokemon);
    assert!(!lookup.has_identifier());
    assert_eq!(lookup.set_key.as_deref(), Some("Base Set"));

    let mtg = card("scry-1", Game::Mtg);
    let lookup = LookupRequest::from_card(&mtg);
    assert_eq!(lookup.alternate_id.as_deref(), Some("scry-1"));
    assert!(lookup.has_identifier());
  }
}
