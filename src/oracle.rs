//! The scoring oracle: the capability that plays the character, judges the
//! learner's argument and proposes scenarios.
//!
//! Oracle output is never trusted. Implementations return a `RawEvaluation`
//! (every field optional) and `Evaluation::from_raw` applies defaults and the
//! documented ranges before anything reaches storage.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::ScoringVariant;
use crate::domain::{Character, Difficulty, Tone};
use crate::error::OracleError;
use crate::seeds::local_scenario;
use crate::translate::PhraseTranslator;

/// Topic, situation and opening stance for a new debate.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
  pub topic: String,
  pub scenario: String,
  pub ai_stance: String,
}

impl Scenario {
  /// Fill blanks left by a sloppy model answer.
  pub fn with_defaults(topic: Option<String>, scenario: Option<String>, ai_stance: Option<String>) -> Self {
    Self {
      topic: topic.unwrap_or_else(|| "General Discussion".into()),
      scenario: scenario.unwrap_or_else(|| "A debate about different perspectives.".into()),
      ai_stance: ai_stance.unwrap_or_else(|| "I have strong opinions on this matter.".into()),
    }
  }
}

/// Everything the oracle needs to judge one round.
#[derive(Clone, Debug)]
pub struct TurnContext {
  pub character_name: String,
  pub personality: String,
  pub current_stance: String,
  pub persuasion_resistance: i32,
  pub language: String,
  pub topic: String,
  pub message: String,
  pub tone: Tone,
  pub variant: ScoringVariant,
}

/// Oracle answer before validation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawEvaluation {
  pub message: Option<String>,
  pub persuasion_strength: Option<f64>,
  pub translation_accuracy: Option<f64>,
  pub cultural_appropriateness: Option<f64>,
  pub persuasion_change: Option<f64>,
  pub feedback: Option<String>,
  pub cultural_context: Option<String>,
  pub xp_awarded: Option<f64>,
  pub should_end_conversation: Option<bool>,
}

impl RawEvaluation {
  /// Lenient extraction: numbers may arrive as JSON numbers or numeric strings,
  /// anything else becomes `None`.
  pub fn from_json(v: &Value) -> Self {
    Self {
      message: text(v, "message"),
      persuasion_strength: number(v, "persuasionStrength"),
      translation_accuracy: number(v, "translationAccuracy"),
      cultural_appropriateness: number(v, "culturalAppropriateness"),
      persuasion_change: number(v, "persuasionChange"),
      feedback: text(v, "feedback"),
      cultural_context: text(v, "culturalContext"),
      xp_awarded: number(v, "xpAwarded"),
      should_end_conversation: flag(v, "shouldEndConversation"),
    }
  }
}

fn number(v: &Value, key: &str) -> Option<f64> {
  match v.get(key)? {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  }
}

fn text(v: &Value, key: &str) -> Option<String> {
  v.get(key)?
    .as_str()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

fn flag(v: &Value, key: &str) -> Option<bool> {
  match v.get(key)? {
    Value::Bool(b) => Some(*b),
    Value::String(s) => s.trim().parse::<bool>().ok(),
    _ => None,
  }
}

/// Oracle answer after defaults and clamping; safe to store.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
  pub message: String,
  pub persuasion_strength: i32,
  pub translation_accuracy: i32,
  pub cultural_appropriateness: i32,
  pub persuasion_change: i32,
  pub feedback: String,
  pub cultural_context: Option<String>,
  pub xp_awarded: i32,
  pub should_end_conversation: bool,
}

fn clamp_round(v: Option<f64>, default: i32, lo: i32, hi: i32) -> i32 {
  match v.filter(|x| x.is_finite()) {
    Some(x) => x.round().clamp(lo as f64, hi as f64) as i32,
    None => default.clamp(lo, hi),
  }
}

/// Scores and XP have no meaningful zero; a 0 means the model left it unset.
fn unset_if_zero(v: Option<f64>) -> Option<f64> {
  v.filter(|x| *x != 0.0)
}

impl Evaluation {
  pub fn from_raw(raw: RawEvaluation, variant: ScoringVariant) -> Self {
    let (xp_lo, xp_hi) = variant.xp_range();
    let score = |v| clamp_round(unset_if_zero(v), 50, 1, 100);
    Self {
      message: raw.message.unwrap_or_else(|| "I'm sorry, I didn't understand that.".into()),
      persuasion_strength: score(raw.persuasion_strength),
      translation_accuracy: score(raw.translation_accuracy),
      cultural_appropriateness: score(raw.cultural_appropriateness),
      persuasion_change: clamp_round(raw.persuasion_change, 0, -50, 50),
      feedback: raw.feedback.unwrap_or_else(|| "Good attempt at persuasion.".into()),
      cultural_context: raw.cultural_context,
      xp_awarded: clamp_round(unset_if_zero(raw.xp_awarded), variant.default_xp(), xp_lo, xp_hi),
      should_end_conversation: raw.should_end_conversation.unwrap_or(false),
    }
  }
}

#[async_trait]
pub trait ScoringOracle: Send + Sync {
  /// Short label for logs.
  fn name(&self) -> &'static str;

  async fn generate_scenario(&self, character: &Character, difficulty: Difficulty) -> Result<Scenario, OracleError>;

  async fn evaluate(&self, turn: &TurnContext) -> Result<RawEvaluation, OracleError>;
}

/// Offline stand-in used when no OpenAI key is configured. Deterministic:
/// scores come from tone, argument length, the character's resistance and
/// whether the learner wrote in the character's language.
pub struct LocalOracle {
  translator: Arc<PhraseTranslator>,
}

impl LocalOracle {
  pub fn new(translator: Arc<PhraseTranslator>) -> Self { Self { translator } }
}

#[async_trait]
impl ScoringOracle for LocalOracle {
  fn name(&self) -> &'static str { "local" }

  async fn generate_scenario(&self, character: &Character, difficulty: Difficulty) -> Result<Scenario, OracleError> {
    Ok(local_scenario(character, difficulty))
  }

  #[instrument(level = "debug", skip(self, turn), fields(character = %turn.character_name, tone = %turn.tone))]
  async fn evaluate(&self, turn: &TurnContext) -> Result<RawEvaluation, OracleError> {
    let words = turn.message.split_whitespace().count() as i32;
    let tone_bonus = match turn.tone {
      Tone::Formal => 10,
      Tone::Polite => 8,
      Tone::Passionate => 5,
      Tone::Casual => 0,
    };
    let strength = (30 + (words * 4).min(40) + tone_bonus).clamp(1, 100);

    let detected = self.translator.detect(&turn.message);
    let accuracy = if detected.eq_ignore_ascii_case(&turn.language) {
      80
    } else if detected == "en" {
      35
    } else {
      55
    };

    let cultural = match turn.tone {
      Tone::Polite => 85,
      Tone::Formal => 80,
      Tone::Casual => 60,
      Tone::Passionate => 55,
    };

    let change = ((strength - turn.persuasion_resistance) / 2).clamp(-50, 50);
    let xp = 10 + (strength + accuracy + cultural) / 10;

    let message = if change > 10 {
      format!("{} nods slowly. \"You make a fair point about {}. I am listening.\"", turn.character_name, turn.topic)
    } else if change < -10 {
      format!("{} folds their arms. \"No. {}\"", turn.character_name, turn.current_stance)
    } else {
      format!("{} considers this. \"Perhaps, but you have not convinced me yet.\"", turn.character_name)
    };
    let feedback = match (strength >= 70, accuracy >= 70) {
      (true, true) => "Strong argument, delivered in the right language.",
      (true, false) => "Strong argument; try expressing more of it in the character's language.",
      (false, true) => "Good language use; add concrete reasons to make the argument land.",
      (false, false) => "Give more reasons and try using phrases in the character's language.",
    };

    debug!(target: "oracle", strength, accuracy, cultural, change, detected, "Local evaluation");
    Ok(RawEvaluation {
      message: Some(message),
      persuasion_strength: Some(strength as f64),
      translation_accuracy: Some(accuracy as f64),
      cultural_appropriateness: Some(cultural as f64),
      persuasion_change: Some(change as f64),
      feedback: Some(feedback.into()),
      cultural_context: None,
      xp_awarded: Some(xp as f64),
      should_end_conversation: Some(strength >= 90 && change >= 40),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn out_of_range_scores_are_clamped() {
    let raw = RawEvaluation::from_json(&json!({
      "message": "Ɛnyɛ nokware",
      "persuasionStrength": 150,
      "translationAccuracy": 0,
      "culturalAppropriateness": 99.6,
      "persuasionChange": -80,
      "xpAwarded": -5,
      "shouldEndConversation": true
    }));
    let e = Evaluation::from_raw(raw.clone(), ScoringVariant::Persuasion);
    assert_eq!(e.persuasion_strength, 100);
    assert_eq!(e.translation_accuracy, 50);
    assert_eq!(e.cultural_appropriateness, 100);
    assert_eq!(e.persuasion_change, -50);
    assert_eq!(e.xp_awarded, 10);
    assert!(e.should_end_conversation);

    let e = Evaluation::from_raw(raw, ScoringVariant::Conversation);
    assert_eq!(e.xp_awarded, 5);
  }

  #[test]
  fn malformed_output_falls_back_to_defaults() {
    let raw = RawEvaluation::from_json(&json!({
      "message": "   ",
      "persuasionStrength": "very",
      "persuasionChange": "12",
      "xpAwarded": null,
      "shouldEndConversation": "maybe"
    }));
    assert_eq!(raw.persuasion_change, Some(12.0));
    let e = Evaluation::from_raw(raw, ScoringVariant::Persuasion);
    assert_eq!(e.message, "I'm sorry, I didn't understand that.");
    assert_eq!(e.persuasion_strength, 50);
    assert_eq!(e.translation_accuracy, 50);
    assert_eq!(e.persuasion_change, 12);
    assert_eq!(e.feedback, "Good attempt at persuasion.");
    assert_eq!(e.xp_awarded, 20);
    assert!(!e.should_end_conversation);

    let e = Evaluation::from_raw(RawEvaluation::default(), ScoringVariant::Conversation);
    assert_eq!(e.xp_awarded, 10);
  }

  #[test]
  fn zero_scores_and_xp_take_defaults() {
    let raw = RawEvaluation::from_json(&json!({
      "persuasionStrength": 0,
      "translationAccuracy": "0",
      "culturalAppropriateness": 0.0,
      "persuasionChange": 0,
      "xpAwarded": 0
    }));
    let e = Evaluation::from_raw(raw.clone(), ScoringVariant::Persuasion);
    assert_eq!((e.persuasion_strength, e.translation_accuracy, e.cultural_appropriateness), (50, 50, 50));
    assert_eq!(e.persuasion_change, 0);
    assert_eq!(e.xp_awarded, 20);
    assert_eq!(Evaluation::from_raw(raw, ScoringVariant::Conversation).xp_awarded, 10);

    // Small non-zero values are real answers and still clamp.
    let e = Evaluation::from_raw(RawEvaluation { persuasion_strength: Some(0.4), ..Default::default() }, ScoringVariant::Persuasion);
    assert_eq!(e.persuasion_strength, 1);
  }

  #[tokio::test]
  async fn local_oracle_rewards_polite_twi() {
    let oracle = LocalOracle::new(Arc::new(PhraseTranslator::new().unwrap()));
    let turn = TurnContext {
      character_name: "Kwame".into(),
      personality: "Wise".into(),
      current_stance: "Traditional ways are always better".into(),
      persuasion_resistance: 70,
      language: "Twi".into(),
      topic: "Traditional vs Modern Medicine".into(),
      message: "Me paakyɛw, me dwene sɛ hospital no yɛ papa ma yɛn nyinaa".into(),
      tone: Tone::Polite,
      variant: ScoringVariant::Persuasion,
    };
    let e = Evaluation::from_raw(oracle.evaluate(&turn).await.unwrap(), ScoringVariant::Persuasion);
    assert_eq!(e.translation_accuracy, 80);
    assert_eq!(e.cultural_appropriateness, 85);
    assert!((10..=50).contains(&e.xp_awarded));
    assert!((-50..=50).contains(&e.persuasion_change));

    let english = TurnContext { message: "hi".into(), tone: Tone::Casual, ..turn };
    let e = Evaluation::from_raw(oracle.evaluate(&english).await.unwrap(), ScoringVariant::Persuasion);
    assert_eq!(e.translation_accuracy, 35);
    assert!(e.persuasion_change < 0);
  }
}
