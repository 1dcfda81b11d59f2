//! Rule-based phrase translator for Twi, Ga and Ewe, plus a tiny language detector.
//!
//! This is a phrase book, not a translation engine: known phrases are swapped
//! for their English meaning and anything else is left alone. Each language
//! table compiles into ONE case-insensitive alternation (longest phrase first)
//! so a single pass never re-translates text it already produced.

use std::collections::HashMap;

use regex::{Captures, Regex};
use serde::Serialize;
use tracing::{debug, instrument, warn};

const TWI: &[(&str, &str)] = &[
  ("Akwaaba", "Welcome"),
  ("Me paakyɛw", "Please"),
  ("Medaase", "Thank you"),
  ("Dabi", "No"),
  ("Aane", "Yes"),
  ("Wobɛyɛ sɛn?", "How are you?"),
  ("Me ho ye", "I am fine"),
  ("Me kɔ didi", "I want to eat"),
  ("Me dwene sɛ", "I think that"),
  ("Mennyɛ", "I disagree"),
  ("Me gye di", "I believe"),
  ("Ɛyɛ nokware", "It is true"),
  ("Ɛnyɛ nokware", "It is not true"),
  ("Minim", "Listen"),
  ("Tie", "Understand"),
];

const GA: &[(&str, &str)] = &[
  ("Akwaaba", "Welcome"),
  ("Ejɛ", "Please"),
  ("Oyiwladɛɛ", "Thank you"),
  ("Aai", "No"),
  ("Ehn", "Yes"),
  ("Bawo ni?", "How are you?"),
  ("Mi yɛ", "I am fine"),
  ("Mi ko didi", "I want to eat"),
  ("Mi sumo ni", "I think that"),
  ("Mi kɛ kyɛ", "I disagree"),
  ("Mi gyɛ", "I believe"),
  ("Enɛ nokore", "It is true"),
  ("Enɛ menye nokore", "It is not true"),
  ("Tɛ", "Listen"),
  ("Se", "Understand"),
];

const EWE: &[(&str, &str)] = &[
  ("Woezɔ", "Welcome"),
  ("Meɖe kuku", "Please"),
  ("Akpe na wò", "Thank you"),
  ("Ao", "No"),
  ("Ɛ̃", "Yes"),
  ("Ale ka?", "How are you?"),
  ("Enyo", "I am fine"),
  ("Me di be maɖu nu", "I want to eat"),
  ("Mebu be", "I think that"),
  ("Nyemelɔ̃ o", "I disagree"),
  ("Mexɔe se", "I believe"),
  ("Enye nyateƒe", "It is true"),
  ("Menye nyateƒe o", "It is not true"),
  ("Se", "Listen"),
  ("Gɔme", "Understand"),
];

/// Detection order matters: the first matching language wins.
const DETECTORS: &[(&str, &str)] = &[
  ("twi", r"(?i)[ɛɔɑ]|ɛyɛ|medaase|akwaaba|dwene|gyɛ"),
  ("ga", r"(?i)[ɛɔ]|ejɛ|oyiwladɛɛ|bawo|sumo|gyɛ"),
  ("ewe", r"(?i)[ɛɔ]|\x{303}|woezɔ|akpe|ale ka|mebu|mexɔe"),
];

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
  pub original_text: String,
  pub translated_text: String,
  pub detected_language: String,
}

struct PhraseTable {
  pattern: Regex,
  by_lower: HashMap<String, &'static str>,
}

impl PhraseTable {
  fn build(phrases: &[(&'static str, &'static str)]) -> Result<Self, regex::Error> {
    let mut sorted: Vec<&(&str, &str)> = phrases.iter().collect();
    sorted.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
    let alternation = sorted
      .iter()
      .map(|(src, _)| regex::escape(src))
      .collect::<Vec<_>>()
      .join("|");
    let pattern = Regex::new(&format!("(?i)(?:{})", alternation))?;
    let by_lower = phrases.iter().map(|(src, en)| (src.to_lowercase(), *en)).collect();
    Ok(Self { pattern, by_lower })
  }

  fn apply(&self, text: &str) -> String {
    self
      .pattern
      .replace_all(text, |caps: &Captures| {
        let hit = &caps[0];
        self.by_lower.get(&hit.to_lowercase()).copied().unwrap_or(hit).to_string()
      })
      .into_owned()
  }
}

pub struct PhraseTranslator {
  tables: HashMap<&'static str, PhraseTable>,
  detectors: Vec<(&'static str, Regex)>,
}

impl PhraseTranslator {
  pub fn new() -> Result<Self, regex::Error> {
    let mut tables = HashMap::new();
    tables.insert("twi", PhraseTable::build(TWI)?);
    tables.insert("ga", PhraseTable::build(GA)?);
    tables.insert("ewe", PhraseTable::build(EWE)?);

    let detectors = DETECTORS
      .iter()
      .map(|(lang, re)| Regex::new(re).map(|r| (*lang, r)))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self { tables, detectors })
  }

  /// Best guess among twi / ga / ewe; "en" when nothing matches.
  pub fn detect(&self, text: &str) -> &'static str {
    self
      .detectors
      .iter()
      .find(|(_, re)| re.is_match(text))
      .map(|(lang, _)| *lang)
      .unwrap_or("en")
  }

  #[instrument(level = "debug", skip(self, text), fields(text_len = text.len(), ?source_language, %target_language))]
  pub fn translate(&self, text: &str, source_language: Option<&str>, target_language: &str) -> Translation {
    if !target_language.eq_ignore_ascii_case("en") {
      warn!(target: "translate", %target_language, "Only English targets are supported; translating to English");
    }

    let source = match source_language.map(str::trim).filter(|s| !s.is_empty()) {
      Some(s) => s.to_lowercase(),
      None => self.detect(text).to_string(),
    };

    let mut translated = match self.tables.get(source.as_str()) {
      Some(table) => table.apply(text),
      None => text.to_string(),
    };

    if translated == text && !text.is_empty() {
      translated = format!("[Translation needed: \"{}\"]", text);
    }
    debug!(target: "translate", %source, changed = !translated.starts_with("[Translation needed"), "Phrase translation done");

    Translation { original_text: text.to_string(), translated_text: translated, detected_language: source }
  }
}
