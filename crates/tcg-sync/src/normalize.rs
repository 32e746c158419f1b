//! Card name and number normalization shared by set sync and the scheduler.
//!
//! Both sides of a match (our card, the provider's listing) go through the
//! same functions, so the rules only have to agree with themselves.

/// Spelling variants the provider uses differently from printed card text
const SPELLING_FIXES: &[(&str, &str)] = &[("impostor", "imposter")];

/// Case-fold a display name and strip the symbols that differ between sources.
///
/// Gender glyphs become ` f` / ` m` (Nidoran♀ -> "nidoran f"), `δ` becomes
/// ` delta`, accents are dropped, apostrophes and periods removed, hyphens
/// turned into spaces and runs of whitespace collapsed.
pub fn normalize_name(name: &str) -> String {
  let mut out = String::with_capacity(name.len());

  for ch in name.to_lowercase().chars() {
    match ch {
      '♀' => out.push_str(" f"),
      '♂' => out.push_str(" m"),
      'δ' => out.push_str(" delta"),
      'é' | 'è' | 'ê' | 'ë' => out.push('e'),
      'á' | 'à' | 'â' | 'ä' => out.push('a'),
      'í' | 'ì' | 'ï' => out.push('i'),
      'ó' | 'ò' | 'ô' | 'ö' => out.push('o'),
      'ú' | 'ù' | 'û' | 'ü' => out.push('u'),
      'ñ' => out.push('n'),
      '\'' | '’' | '.' | ':' | ',' | '!' => {}
      '-' => out.push(' '),
      other => out.push(other),
    }
  }

  let mut normalized = out.split_whitespace().collect::<Vec<_>>().join(" ");
  for (from, to) in SPELLING_FIXES {
    if normalized.contains(from) {
      normalized = normalized.replace(from, to);
    }
  }
  normalized
}

/// Card number without the `/total` suffix, trimmed and lowercased
pub fn strip_set_total(number: &str) -> String {
  let head = number.split('/').next().unwrap_or(number);
  head.trim().to_lowercase()
}

/// Leading zeros removed, with "0" as the floor so "000" does not vanish
pub fn strip_leading_zeros(number: &str) -> String {
  let trimmed = number.trim_start_matches('0');
  if trimmed.is_empty() && !number.is_empty() {
    "0".to_string()
  } else {
    trimmed.to_string()
  }
}

/// Canonical number key: no set total, no leading zeros. "073/102" -> "73".
pub fn normalize_number(number: &str) -> String {
  strip_leading_zeros(&strip_set_total(number))
}

/// Every key a card number is indexed and looked up under, most reliable first:
/// zero-stripped, then without the set total, then the raw text.
pub fn number_keys(number: &str) -> Vec<String> {
  let raw = number.trim().to_lowercase();
  if raw.is_empty() {
    return Vec::new();
  }

  let mut keys: Vec<String> = Vec::with_capacity(3);
  for key in [normalize_number(number), strip_set_total(number), raw] {
    if !key.is_empty() && !keys.contains(&key) {
      keys.push(key);
    }
  }
  keys
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_normalize_name_symbols() {
    assert_eq!(normalize_name("Nidoran♀"), "nidoran f");
    assert_eq!(normalize_name("Nidoran ♂"), "nidoran m");
    assert_eq!(normalize_name("Flygon δ"), "flygon delta");
    assert_eq!(normalize_name("Pokémon Center"), "pokemon center");
    assert_eq!(normalize_name("Farfetch'd"), "farfetchd");
    assert_eq!(normalize_name("Mr. Mime"), "mr mime");
    assert_eq!(normalize_name("Ho-Oh"), "ho oh");
  }

  #[test]
  fn test_normalize_name_spelling_and_spacing() {
    assert_eq!(normalize_name("Impostor Professor Oak"), "imposter professor oak");
    assert_eq!(normalize_name("  Dark   Charizard "), "dark charizard");
    assert_eq!(normalize_name("Blaine’s Arcanine"), "blaines arcanine");
  }

  #[test]
  fn test_normalize_number() {
    assert_eq!(normalize_number("073/102"), "73");
    assert_eq!(normalize_number("073"), "73");
    assert_eq!(normalize_number("000"), "0");
    assert_eq!(normalize_number("TG05/TG30"), "tg05");
    assert_eq!(normalize_number(""), "");
  }

  #[test]
  fn test_number_keys_order() {
    assert_eq!(number_keys("073/102"), vec!["73", "073", "073/102"]);
    assert_eq!(number_keys("4"), vec!["4"]);
    assert_eq!(number_keys("SV001"), vec!["sv001"]);
    assert!(number_keys("  ").is_empty());
  }
}
