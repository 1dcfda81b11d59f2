//! Domain models: users, characters, conversations, messages and achievements,
//! plus the small enums (sender, tone, difficulty) they carry.
//!
//! All records serialize as camelCase JSON so the SPA can consume them directly.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type CharacterId = i64;
pub type ConversationId = i64;
pub type MessageId = i64;
pub type AchievementId = i64;

/// Achievement type unlocked by the first accepted round of a conversation.
pub const CONVERSATION_STARTER: &str = "conversation_starter";

/// Who wrote a message.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
  User,
  Ai,
}

/// Communication tone the learner picks before sending an argument.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
  #[default]
  Polite,
  Passionate,
  Formal,
  Casual,
}

impl Tone {
  pub fn as_str(&self) -> &'static str {
    match self {
      Tone::Polite => "polite",
      Tone::Passionate => "passionate",
      Tone::Formal => "formal",
      Tone::Casual => "casual",
    }
  }
}

impl fmt::Display for Tone {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Beginner,
  Intermediate,
  Advanced,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Beginner => "beginner",
      Difficulty::Intermediate => "intermediate",
      Difficulty::Advanced => "advanced",
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Difficulty {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "beginner" => Ok(Difficulty::Beginner),
      "intermediate" => Ok(Difficulty::Intermediate),
      "advanced" => Ok(Difficulty::Advanced),
      other => Err(format!("unknown difficulty '{}' (expected beginner, intermediate or advanced)", other)),
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: UserId,
  pub username: String,
  pub streak: i32,
  pub hearts: i32,
  pub total_xp: i64,
  pub level: i32,
  pub avatar: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewUser {
  pub username: String,
  pub avatar: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Character {
  pub id: CharacterId,
  pub name: String,
  pub role: String,
  pub location: String,
  pub language: String,
  pub personality: String,
  pub avatar: Option<String>,
  pub background_context: String,
  pub cultural_tips: Vec<String>,
  /// 0–100, higher is harder to convince.
  pub persuasion_resistance: i32,
  pub current_stance: String,
  pub is_active: bool,
}

/// Character definition without an id, as found in seeds and the TOML bank.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NewCharacter {
  pub name: String,
  pub role: String,
  pub location: String,
  pub language: String,
  pub personality: String,
  #[serde(default)] pub avatar: Option<String>,
  #[serde(default)] pub background_context: String,
  #[serde(default)] pub cultural_tips: Vec<String>,
  #[serde(default = "default_resistance")] pub persuasion_resistance: i32,
  #[serde(default)] pub current_stance: String,
  #[serde(default = "default_true")] pub is_active: bool,
}

fn default_resistance() -> i32 { 50 }
fn default_true() -> bool { true }

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
  pub id: ConversationId,
  pub user_id: UserId,
  pub character_id: CharacterId,
  pub title: String,
  pub topic: String,
  pub scenario: String,
  pub ai_stance: String,
  pub difficulty: Difficulty,
  pub progress: i32,
  pub total_rounds: i32,
  /// Running sum of per-round persuasion deltas; deliberately unbounded.
  pub persuasion_score: i64,
  pub xp_earned: i64,
  pub is_completed: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewConversation {
  pub user_id: UserId,
  pub character_id: CharacterId,
  pub title: String,
  pub topic: String,
  pub scenario: String,
  pub ai_stance: String,
  pub difficulty: Difficulty,
  pub total_rounds: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
  pub id: MessageId,
  pub conversation_id: ConversationId,
  pub sender: Sender,
  pub content: String,
  pub tone: Option<Tone>,
  pub persuasion_strength: Option<i32>,
  pub translation_accuracy: Option<i32>,
  pub cultural_appropriateness: Option<i32>,
  pub persuasion_change: Option<i32>,
  /// Feedback text from the oracle about the user's argument.
  pub ai_response: Option<String>,
  pub cultural_context: Option<String>,
  pub xp_awarded: i32,
  pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewMessage {
  pub sender: Sender,
  pub content: String,
  pub tone: Option<Tone>,
  pub persuasion_strength: Option<i32>,
  pub translation_accuracy: Option<i32>,
  pub cultural_appropriateness: Option<i32>,
  pub persuasion_change: Option<i32>,
  pub ai_response: Option<String>,
  pub cultural_context: Option<String>,
  pub xp_awarded: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
  pub id: AchievementId,
  pub user_id: UserId,
  #[serde(rename = "type")]
  pub kind: String,
  pub title: String,
  pub description: String,
  pub xp_reward: i32,
  pub unlocked_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewAchievement {
  pub user_id: UserId,
  pub kind: String,
  pub title: String,
  pub description: String,
  pub xp_reward: i32,
}
