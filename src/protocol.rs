//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//! Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::domain::{Achievement, Character, Conversation, Tone, UserId};
use crate::translate::Translation;

/// Account the SPA uses when it does not send a user id.
pub const DEFAULT_USER_ID: UserId = 1;

fn default_user_id() -> UserId { DEFAULT_USER_ID }
fn default_target_language() -> String { "en".into() }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationIn {
    #[serde(default = "default_user_id")]
    pub user_id: UserId,
    pub character_id: i64,
    pub difficulty: String,
    #[serde(default)]
    pub title: Option<String>,
}
#[derive(Serialize)]
pub struct ConversationOut {
    pub conversation: Conversation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageIn {
    pub content: String,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateIn {
    pub text: String,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default = "default_target_language")]
    pub target_language: String,
}
#[derive(Serialize)]
pub struct TranslateOut {
    pub translation: Translation,
}

#[derive(Serialize)]
pub struct CharactersOut {
    pub characters: Vec<Character>,
}
#[derive(Serialize)]
pub struct CharacterOut {
    pub character: Character,
}

#[derive(Serialize)]
pub struct AchievementsOut {
    pub achievements: Vec<Achievement>,
}
#[derive(Serialize)]
pub struct ConversationsOut {
    pub conversations: Vec<Conversation>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
    pub ok: bool,
    pub oracle: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_apply() {
        let c: CreateConversationIn = serde_json::from_str(r#"{"characterId": 2, "difficulty": "beginner"}"#).unwrap();
        assert_eq!(c.user_id, DEFAULT_USER_ID);
        assert!(c.title.is_none());

        let m: SendMessageIn = serde_json::from_str(r#"{"content": "Aane"}"#).unwrap();
        assert_eq!(m.tone, Tone::Polite);
        assert!(m.user_id.is_none());

        let t: TranslateIn = serde_json::from_str(r#"{"text": "Medaase", "sourceLanguage": "twi"}"#).unwrap();
        assert_eq!(t.target_language, "en");
        assert_eq!(t.source_language.as_deref(), Some("twi"));
    }

    #[test]
    fn unknown_tone_is_rejected() {
        assert!(serde_json::from_str::<SendMessageIn>(r#"{"content": "x", "tone": "angry"}"#).is_err());
    }
}
