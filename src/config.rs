//! Loading agent configuration (prompts, game settings, extra characters) from TOML.
//!
//! See `AgentConfig`, `Prompts` and `GameSettings` for the expected schema:
//!
//! ```toml
//! [game]
//! total_rounds = 5
//! scoring_variant = "persuasion"   # or "conversation"
//! starter_achievement_xp = 50
//!
//! [[characters]]
//! name = "Esi"
//! role = "Market Trader"
//! location = "Cape Coast, Ghana"
//! language = "Twi"
//! personality = "Shrewd, funny, loves bargaining"
//! persuasion_resistance = 60
//! current_stance = "Mobile money will never replace cash"
//! ```

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::NewCharacter;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub game: GameSettings,
  #[serde(default)]
  pub characters: Vec<NewCharacter>,
}

/// Which clamping profile is applied to the oracle's XP award.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringVariant {
  /// Persuasion game: xp in [10, 50], default 20.
  #[default]
  Persuasion,
  /// Plain conversation practice: xp in [5, 15], default 10.
  Conversation,
}

impl ScoringVariant {
  pub fn xp_range(&self) -> (i32, i32) {
    match self {
      ScoringVariant::Persuasion => (10, 50),
      ScoringVariant::Conversation => (5, 15),
    }
  }

  pub fn default_xp(&self) -> i32 {
    match self {
      ScoringVariant::Persuasion => 20,
      ScoringVariant::Conversation => 10,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GameSettings {
  pub total_rounds: i32,
  pub scoring_variant: ScoringVariant,
  pub starter_achievement_xp: i32,
}

impl Default for GameSettings {
  fn default() -> Self {
    Self { total_rounds: 5, scoring_variant: ScoringVariant::Persuasion, starter_achievement_xp: 50 }
  }
}

/// Prompts used by the OpenAI oracle. Placeholders are `{name}` style, see `util::fill_template`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub scenario_system: String,
  pub scenario_user_template: String,
  pub evaluate_system: String,
  pub evaluate_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      scenario_system: "You design persuasion game scenarios for a Ghanaian language-learning app. Respond ONLY with strict JSON.".into(),
      scenario_user_template: "Create a persuasion game scenario for {name}, a {role} from Ghana who speaks {language}.\n\nDifficulty level: {difficulty}\n\nGenerate a controversial topic and scenario where the player must persuade {name} to change their mind. The topic should be:\n- Culturally relevant to Ghana\n- Appropriate for the difficulty level\n- Something {name} would have a strong opinion about\n\nRespond with a JSON object containing:\n- topic: The debate topic (e.g., \"Traditional vs Modern Medicine\")\n- scenario: Brief description of the situation in English\n- aiStance: {name}'s initial strong opinion on the topic".into(),
      evaluate_system: "You are an AI language tutor character. Always respond with valid JSON.".into(),
      evaluate_user_template: "You are {name}, a {personality} from Ghana.\n\nYour current stance on \"{topic}\": {stance}\nYour persuasion resistance: {resistance}/100 (higher = harder to convince)\n\nThe user is trying to persuade you about \"{topic}\" using this argument in {language}: \"{message}\"\nTheir communication tone was: {tone}\n\nEvaluate their persuasive attempt and respond with a JSON object containing:\n- message: Your response in {language} (stay in character, react to their argument)\n- persuasionStrength: 1-100 (how convincing was their argument?)\n- translationAccuracy: 1-100 (how accurate was their {language}?)\n- culturalAppropriateness: 1-100 (did they use appropriate tone/respect for your culture?)\n- persuasionChange: -50 to +50 (how much did your stance shift? Consider your resistance level)\n- feedback: Brief evaluation in English of their argument's strengths/weaknesses\n- culturalContext: optional short cultural note in English\n- xpAwarded: {xp_min}-{xp_max} points based on overall performance\n- shouldEndConversation: true if fully convinced or discussion has run its course\n\nBe realistic about persuasion - don't change your mind easily given your resistance level.".into(),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "kasa_backend", %path, characters = cfg.characters.len(), "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "kasa_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "kasa_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_agent_config(s: &str) -> Result<AgentConfig, toml::de::Error> {
  let mut cfg = toml::from_str::<AgentConfig>(s)?;
  if cfg.game.total_rounds < 1 {
    error!(target: "kasa_backend", total_rounds = cfg.game.total_rounds, "total_rounds must be positive; using 5");
    cfg.game.total_rounds = 5;
  }
  Ok(cfg)
}
