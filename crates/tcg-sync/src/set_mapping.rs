//! Translation from our set names and codes to the provider's set keys.

use std::collections::HashMap;

/// Maps an internal set name (or set code) to the provider's set key
pub trait SetKeyTranslator: Send + Sync {
  /// `None` means the set is unknown; callers must treat it as permanent
  fn translate(&self, set_name: &str) -> Option<String>;
}

/// Known set keys. Both the set code and the normalized set name are listed.
const KNOWN_SETS: &[(&str, &str)] = &[
  // Sword & Shield era
  ("swsh1", "swsh01-sword-and-shield-pokemon"),
  ("sword-and-shield", "swsh01-sword-and-shield-pokemon"),
  ("swsh2", "swsh02-rebel-clash-pokemon"),
  ("rebel-clash", "swsh02-rebel-clash-pokemon"),
  ("swsh3", "swsh03-darkness-ablaze-pokemon"),
  ("darkness-ablaze", "swsh03-darkness-ablaze-pokemon"),
  ("swsh4", "swsh04-vivid-voltage-pokemon"),
  ("vivid-voltage", "swsh04-vivid-voltage-pokemon"),
  ("swsh5", "swsh05-battle-styles-pokemon"),
  ("battle-styles", "swsh05-battle-styles-pokemon"),
  ("swsh6", "swsh06-chilling-reign-pokemon"),
  ("chilling-reign", "swsh06-chilling-reign-pokemon"),
  ("swsh7", "swsh07-evolving-skies-pokemon"),
  ("evolving-skies", "swsh07-evolving-skies-pokemon"),
  ("swsh8", "swsh08-fusion-strike-pokemon"),
  ("fusion-strike", "swsh08-fusion-strike-pokemon"),
  ("swsh9", "swsh09-brilliant-stars-pokemon"),
  ("brilliant-stars", "swsh09-brilliant-stars-pokemon"),
  ("swsh10", "swsh10-astral-radiance-pokemon"),
  ("astral-radiance", "swsh10-astral-radiance-pokemon"),
  ("swsh11", "swsh11-lost-origin-pokemon"),
  ("lost-origin", "swsh11-lost-origin-pokemon"),
  ("swsh12", "swsh12-silver-tempest-pokemon"),
  ("silver-tempest", "swsh12-silver-tempest-pokemon"),
  ("swsh12pt5", "swsh12pt5-crown-zenith-pokemon"),
  ("crown-zenith", "swsh12pt5-crown-zenith-pokemon"),

  // Sword & Shield special sets
  ("swsh35", "swsh35-champions-path-pokemon"),
  ("champions-path", "swsh35-champions-path-pokemon"),
  ("swsh45", "swsh45-shining-fates-pokemon"),
  ("shining-fates", "swsh45-shining-fates-pokemon"),
  ("cel25", "cel25-celebrations-pokemon"),
  ("celebrations", "cel25-celebrations-pokemon"),
  ("pgo", "pgo-pokemon-go-pokemon"),
  ("pokemon-go", "pgo-pokemon-go-pokemon"),
  ("swsh45sv", "swsh45sv-shiny-vault-pokemon"),
  ("shiny-vault", "swsh45sv-shiny-vault-pokemon"),

  // Scarlet & Violet era
  ("sv1", "sv01-scarlet-and-violet-pokemon"),
  ("scarlet-and-violet", "sv01-scarlet-and-violet-pokemon"),
  ("sv2", "sv02-paldea-evolved-pokemon"),
  ("paldea-evolved", "sv02-paldea-evolved-pokemon"),
  ("sv3", "sv03-obsidian-flames-pokemon"),
  ("obsidian-flames", "sv03-obsidian-flames-pokemon"),
  ("sv3pt5", "sv03pt5-151-pokemon"),
  ("151", "sv03pt5-151-pokemon"),
  ("pokemon-151", "sv03pt5-151-pokemon"),
  ("sv4", "sv04-paradox-rift-pokemon"),
  ("paradox-rift", "sv04-paradox-rift-pokemon"),
  ("sv4pt5", "sv04pt5-paldean-fates-pokemon"),
  ("paldean-fates", "sv04pt5-paldean-fates-pokemon"),
  ("sv5", "sv05-temporal-forces-pokemon"),
  ("temporal-forces", "sv05-temporal-forces-pokemon"),
  ("sv6", "sv06-twilight-masquerade-pokemon"),
  ("twilight-masquerade", "sv06-twilight-masquerade-pokemon"),
  ("sv6pt5", "sv06pt5-shrouded-fable-pokemon"),
  ("shrouded-fable", "sv06pt5-shrouded-fable-pokemon"),
  ("sv7", "sv07-stellar-crown-pokemon"),
  ("stellar-crown", "sv07-stellar-crown-pokemon"),
  ("sv8", "sv08-surging-sparks-pokemon"),
  ("surging-sparks", "sv08-surging-sparks-pokemon"),
  ("sv8pt5", "sv08pt5-prismatic-evolutions-pokemon"),
  ("prismatic-evolutions", "sv08pt5-prismatic-evolutions-pokemon"),

  // Scarlet & Violet special sets
  ("svp", "svp-scarlet-and-violet-promos-pokemon"),
  ("scarlet-and-violet-promos", "svp-scarlet-and-violet-promos-pokemon"),

  // Wizards era
  ("si1", "southern-islands-pokemon"),
  ("southern-islands", "southern-islands-pokemon"),
  ("base1", "base-set-pokemon"),
  ("base", "base-set-pokemon"),
  ("base-set", "base-set-pokemon"),
  ("jungle", "jungle-pokemon"),
  ("fossil", "fossil-pokemon"),
  ("base2", "base-set-2-pokemon"),
  ("base4", "base-set-2-pokemon"),
  ("base-set-2", "base-set-2-pokemon"),
  ("team-rocket", "team-rocket-pokemon"),
  ("gym1", "gym-heroes-pokemon"),
  ("gym-heroes", "gym-heroes-pokemon"),
  ("gym2", "gym-challenge-pokemon"),
  ("gym-challenge", "gym-challenge-pokemon"),
  ("neo1", "neo-genesis-pokemon"),
  ("neo-genesis", "neo-genesis-pokemon"),
  ("neo2", "neo-discovery-pokemon"),
  ("neo-discovery", "neo-discovery-pokemon"),
  ("neo3", "neo-revelation-pokemon"),
  ("neo-revelation", "neo-revelation-pokemon"),
  ("neo4", "neo-destiny-pokemon"),
  ("neo-destiny", "neo-destiny-pokemon"),
  ("base6", "legendary-collection-pokemon"),
  ("legendary-collection", "legendary-collection-pokemon"),

  // e-Card
  ("ecard1", "expedition-pokemon"),
  ("expedition-base-set", "expedition-pokemon"),
  ("expedition", "expedition-pokemon"),
  ("ecard2", "aquapolis-pokemon"),
  ("aquapolis", "aquapolis-pokemon"),
  ("ecard3", "skyridge-pokemon"),
  ("skyridge", "skyridge-pokemon"),

  // EX era
  ("ex1", "ruby-and-sapphire-pokemon"),
  ("ruby-and-sapphire", "ruby-and-sapphire-pokemon"),
  ("ex2", "sandstorm-pokemon"),
  ("sandstorm", "sandstorm-pokemon"),
  ("ex3", "dragon-pokemon"),
  ("dragon", "dragon-pokemon"),
  ("ex4", "team-magma-vs-team-aqua-pokemon"),
  ("team-magma-vs-team-aqua", "team-magma-vs-team-aqua-pokemon"),
  ("ex5", "hidden-legends-pokemon"),
  ("hidden-legends", "hidden-legends-pokemon"),
  ("ex6", "firered-leafgreen-pokemon"),
  ("firered-and-leafgreen", "firered-leafgreen-pokemon"),
  ("firered-leafgreen", "firered-leafgreen-pokemon"),
  ("ex7", "team-rocket-returns-pokemon"),
  ("team-rocket-returns", "team-rocket-returns-pokemon"),
  ("ex8", "deoxys-pokemon"),
  ("deoxys", "deoxys-pokemon"),
  ("ex9", "emerald-pokemon"),
  ("emerald", "emerald-pokemon"),
  ("ex10", "unseen-forces-pokemon"),
  ("unseen-forces", "unseen-forces-pokemon"),
  ("ex11", "delta-species-pokemon"),
  ("delta-species", "delta-species-pokemon"),
  ("ex12", "legend-maker-pokemon"),
  ("legend-maker", "legend-maker-pokemon"),
  ("ex13", "holon-phantoms-pokemon"),
  ("holon-phantoms", "holon-phantoms-pokemon"),
  ("ex14", "crystal-guardians-pokemon"),
  ("crystal-guardians", "crystal-guardians-pokemon"),
  ("ex15", "dragon-frontiers-pokemon"),
  ("dragon-frontiers", "dragon-frontiers-pokemon"),
  ("ex16", "power-keepers-pokemon"),
  ("power-keepers", "power-keepers-pokemon"),

  // Diamond & Pearl era
  ("dp1", "diamond-and-pearl-pokemon"),
  ("diamond-and-pearl", "diamond-and-pearl-pokemon"),
  ("dp2", "mysterious-treasures-pokemon"),
  ("mysterious-treasures", "mysterious-treasures-pokemon"),
  ("dp3", "secret-wonders-pokemon"),
  ("secret-wonders", "secret-wonders-pokemon"),
  ("dp4", "great-encounters-pokemon"),
  ("great-encounters", "great-encounters-pokemon"),
  ("dp5", "majestic-dawn-pokemon"),
  ("majestic-dawn", "majestic-dawn-pokemon"),
  ("dp6", "legends-awakened-pokemon"),
  ("legends-awakened", "legends-awakened-pokemon"),
  ("dp7", "stormfront-pokemon"),
  ("stormfront", "stormfront-pokemon"),

  // Platinum era
  ("pl1", "platinum-pokemon"),
  ("platinum", "platinum-pokemon"),
  ("pl2", "rising-rivals-pokemon"),
  ("rising-rivals", "rising-rivals-pokemon"),
  ("pl3", "supreme-victors-pokemon"),
  ("supreme-victors", "supreme-victors-pokemon"),
  ("pl4", "arceus-pokemon"),
  ("arceus", "arceus-pokemon"),

  // HeartGold SoulSilver era
  ("hgss1", "heartgold-and-soulsilver-pokemon"),
  ("heartgold-soulsilver", "heartgold-and-soulsilver-pokemon"),
  ("hgss2", "unleashed-pokemon"),
  ("unleashed", "unleashed-pokemon"),
  ("hgss3", "undaunted-pokemon"),
  ("undaunted", "undaunted-pokemon"),
  ("hgss4", "triumphant-pokemon"),
  ("triumphant", "triumphant-pokemon"),

  // Black & White era
  ("bw1", "black-and-white-pokemon"),
  ("black-and-white", "black-and-white-pokemon"),
  ("bw2", "emerging-powers-pokemon"),
  ("emerging-powers", "emerging-powers-pokemon"),
  ("bw3", "noble-victories-pokemon"),
  ("noble-victories", "noble-victories-pokemon"),
  ("bw4", "next-destinies-pokemon"),
  ("next-destinies", "next-destinies-pokemon"),
  ("bw5", "dark-explorers-pokemon"),
  ("dark-explorers", "dark-explorers-pokemon"),
  ("bw6", "dragons-exalted-pokemon"),
  ("dragons-exalted", "dragons-exalted-pokemon"),
  ("bw7", "boundaries-crossed-pokemon"),
  ("boundaries-crossed", "boundaries-crossed-pokemon"),
  ("bw8", "plasma-storm-pokemon"),
  ("plasma-storm", "plasma-storm-pokemon"),
  ("bw9", "plasma-freeze-pokemon"),
  ("plasma-freeze", "plasma-freeze-pokemon"),
  ("bw10", "plasma-blast-pokemon"),
  ("plasma-blast", "plasma-blast-pokemon"),
  ("bw11", "legendary-treasures-pokemon"),
  ("legendary-treasures", "legendary-treasures-pokemon"),

  // XY era
  ("xy1", "xy-pokemon"),
  ("xy", "xy-pokemon"),
  ("xy2", "flashfire-pokemon"),
  ("flashfire", "flashfire-pokemon"),
  ("xy3", "furious-fists-pokemon"),
  ("furious-fists", "furious-fists-pokemon"),
  ("xy4", "phantom-forces-pokemon"),
  ("phantom-forces", "phantom-forces-pokemon"),
  ("xy5", "primal-clash-pokemon"),
  ("primal-clash", "primal-clash-pokemon"),
  ("xy6", "roaring-skies-pokemon"),
  ("roaring-skies", "roaring-skies-pokemon"),
  ("xy7", "ancient-origins-pokemon"),
  ("ancient-origins", "ancient-origins-pokemon"),
  ("xy8", "breakthrough-pokemon"),
  ("breakthrough", "breakthrough-pokemon"),
  ("xy9", "breakpoint-pokemon"),
  ("breakpoint", "breakpoint-pokemon"),
  ("xy10", "fates-collide-pokemon"),
  ("fates-collide", "fates-collide-pokemon"),
  ("xy11", "steam-siege-pokemon"),
  ("steam-siege", "steam-siege-pokemon"),
  ("xy12", "evolutions-pokemon"),
  ("evolutions", "evolutions-pokemon"),

  // Sun & Moon era
  ("sm1", "sun-and-moon-pokemon"),
  ("sun-and-moon", "sun-and-moon-pokemon"),
  ("sm2", "guardians-rising-pokemon"),
  ("guardians-rising", "guardians-rising-pokemon"),
  ("sm3", "burning-shadows-pokemon"),
  ("burning-shadows", "burning-shadows-pokemon"),
  ("sm4", "crimson-invasion-pokemon"),
  ("crimson-invasion", "crimson-invasion-pokemon"),
  ("sm5", "ultra-prism-pokemon"),
  ("ultra-prism", "ultra-prism-pokemon"),
  ("sm6", "forbidden-light-pokemon"),
  ("forbidden-light", "forbidden-light-pokemon"),
  ("sm7", "celestial-storm-pokemon"),
  ("celestial-storm", "celestial-storm-pokemon"),
  ("sm8", "lost-thunder-pokemon"),
  ("lost-thunder", "lost-thunder-pokemon"),
  ("sm9", "team-up-pokemon"),
  ("team-up", "team-up-pokemon"),
  ("sm10", "unbroken-bonds-pokemon"),
  ("unbroken-bonds", "unbroken-bonds-pokemon"),
  ("sm11", "unified-minds-pokemon"),
  ("unified-minds", "unified-minds-pokemon"),
  ("sm12", "cosmic-eclipse-pokemon"),
  ("cosmic-eclipse", "cosmic-eclipse-pokemon"),

  // Promos
  ("basep", "wotc-promo-pokemon"),
  ("wizards-black-star-promos", "wotc-promo-pokemon"),
  ("np", "nintendo-promos-pokemon"),
  ("nintendo-black-star-promos", "nintendo-promos-pokemon"),
  ("pop1", "pop-series-1-pokemon"),
  ("pop2", "pop-series-2-pokemon"),
  ("pop3", "pop-series-3-pokemon"),
  ("pop4", "pop-series-4-pokemon"),
  ("pop5", "pop-series-5-pokemon"),
  ("pop6", "pop-series-6-pokemon"),
  ("pop7", "pop-series-7-pokemon"),
  ("pop8", "pop-series-8-pokemon"),
  ("pop9", "pop-series-9-pokemon"),

  // Trainer kits, both halves listed as one set
  ("tk1a", "ex-trainer-kit-1-latias-latios-pokemon"),
  ("tk1b", "ex-trainer-kit-1-latias-latios-pokemon"),
  ("ex-trainer-kit-latias", "ex-trainer-kit-1-latias-latios-pokemon"),
  ("ex-trainer-kit-latios", "ex-trainer-kit-1-latias-latios-pokemon"),
  ("tk2a", "ex-trainer-kit-2-plusle-minun-pokemon"),
  ("tk2b", "ex-trainer-kit-2-plusle-minun-pokemon"),
];

/// Lowercase, spaces to hyphens, apostrophes dropped, `&` spelled out
pub fn normalize_set_key(set_name: &str) -> String {
  set_name.trim().to_lowercase().replace(' ', "-").replace('\'', "").replace('&', "and")
}

/// Translator backed by an in-memory table
#[derive(Debug, Clone)]
pub struct StaticSetTable {
  mappings: HashMap<String, String>,
}

impl StaticSetTable {
  /// Table of the sets the provider is known to carry
  pub fn builtin() -> Self {
    Self::from_pairs(KNOWN_SETS.iter().copied())
  }

  /// Build a table from explicit pairs; keys are stored as given
  pub fn from_pairs<I, K, V>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let mappings = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
    Self { mappings }
  }

  pub fn with_mapping(mut self, set_name: impl Into<String>, set_key: impl Into<String>) -> Self {
    self.mappings.insert(set_name.into(), set_key.into());
    self
  }

  pub fn len(&self) -> usize {
    self.mappings.len()
  }

  pub fn is_empty(&self) -> bool {
    self.mappings.is_empty()
  }
}

impl Default for StaticSetTable {
  fn default() -> Self {
    Self::builtin()
  }
}

impl SetKeyTranslator for StaticSetTable {
  fn translate(&self, set_name: &str) -> Option<String> {
    let normalized = normalize_set_key(set_name);
    self
      .mappings
      .get(&normalized)
      .or_else(|| self.mappings.get(set_name))
      .cloned()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_normalize_set_key() {
    assert_eq!(normalize_set_key("Sword & Shield"), "sword-and-shield");
    assert_eq!(normalize_set_key("Champion's Path"), "champions-path");
    assert_eq!(normalize_set_key(" Base Set "), "base-set");
  }

  #[test]
  fn test_builtin_translates_names_and_codes() {
    let table = StaticSetTable::builtin();
    assert_eq!(table.translate("Base Set").as_deref(), Some("base-set-pokemon"));
    assert_eq!(table.translate("base1").as_deref(), Some("base-set-pokemon"));
    assert_eq!(table.translate("Scarlet & Violet").as_deref(), Some("sv01-scarlet-and-violet-pokemon"));
    assert_eq!(table.translate("151").as_deref(), Some("sv03pt5-151-pokemon"));
    assert_eq!(table.translate("Champion's Path").as_deref(), Some("swsh35-champions-path-pokemon"));
    assert_eq!(table.translate("tk2b").as_deref(), Some("ex-trainer-kit-2-plusle-minun-pokemon"));
  }

  #[test]
  fn test_unknown_set_has_no_guess() {
    let table = StaticSetTable::builtin();
    assert_eq!(table.translate("foo-set"), None);
    assert_eq!(table.translate(""), None);
  }

  #[test]
  fn test_raw_key_is_tried_second() {
    let table = StaticSetTable::from_pairs([("Odd Key", "odd-key-pokemon")]);
    assert_eq!(table.translate("Odd Key").as_deref(), Some("odd-key-pokemon"));

    let table = table.with_mapping("foo-set", "foo-set-pokemon");
    assert_eq!(table.translate("Foo Set").as_deref(), Some("foo-set-pokemon"));
    assert_eq!(table.len(), 2);
  }
}
