//! Minimal OpenAI client acting as the scoring oracle.
//!
//! We only call chat.completions and always request a strict JSON object.
//! Calls are instrumented and log model names, latencies and token usage (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to avoid PII leaks.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::{Character, Difficulty};
use crate::error::OracleError;
use crate::oracle::{RawEvaluation, Scenario, ScoringOracle, TurnContext};
use crate::util::{fill_template, trunc_for_log};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
  pub prompts: Prompts,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env(prompts: Prompts) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let strong_model =
      std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "gpt-4o".into());

    let client = match reqwest::Client::builder().timeout(Duration::from_secs(20)).build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "kasa_backend", error = %e, "Failed to build OpenAI HTTP client; OpenAI disabled");
        return None;
      }
    };

    Some(Self { client, api_key, base_url, fast_model, strong_model, prompts })
  }

  /// JSON-object chat completion. Returns the parsed object, untyped, so the
  /// caller can pick fields leniently.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_json(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<Value, OracleError> {
    let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
      max_tokens: None,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "kasa-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      error!(target: "oracle", elapsed = ?start.elapsed(), status = status.as_u16(), "OpenAI call failed");
      return Err(OracleError::Status { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(target: "oracle", elapsed = ?start.elapsed(), prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    parse_json_object(&text)
  }
}

/// The model is asked for an object; anything else is a decode failure.
fn parse_json_object(text: &str) -> Result<Value, OracleError> {
  let v: Value = serde_json::from_str(text.trim())
    .map_err(|e| OracleError::Decode(format!("JSON parse error: {} in {}", e, trunc_for_log(text, 120))))?;
  if v.is_object() {
    Ok(v)
  } else {
    Err(OracleError::Decode(format!("expected a JSON object, got {}", trunc_for_log(text, 120))))
  }
}

#[async_trait]
impl ScoringOracle for OpenAI {
  fn name(&self) -> &'static str { "openai" }

  #[instrument(level = "info", skip(self, character), fields(character = %character.name, %difficulty, model = %self.fast_model))]
  async fn generate_scenario(&self, character: &Character, difficulty: Difficulty) -> Result<Scenario, OracleError> {
    let user = fill_template(
      &self.prompts.scenario_user_template,
      &[
        ("name", character.name.as_str()),
        ("role", character.role.as_str()),
        ("language", character.language.as_str()),
        ("difficulty", difficulty.as_str()),
      ],
    );
    let v = self.chat_json(&self.fast_model, &self.prompts.scenario_system, &user, 0.7).await?;
    let field = |k: &str| v.get(k).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let scenario = Scenario::with_defaults(field("topic"), field("scenario"), field("aiStance"));
    info!(target: "oracle", topic = %trunc_for_log(&scenario.topic, 60), "Scenario generated");
    Ok(scenario)
  }

  #[instrument(level = "info", skip(self, turn), fields(character = %turn.character_name, tone = %turn.tone, message_len = turn.message.len(), model = %self.strong_model))]
  async fn evaluate(&self, turn: &TurnContext) -> Result<RawEvaluation, OracleError> {
    let resistance = turn.persuasion_resistance.to_string();
    let (xp_min, xp_max) = turn.variant.xp_range();
    let (xp_min, xp_max) = (xp_min.to_string(), xp_max.to_string());
    let user = fill_template(
      &self.prompts.evaluate_user_template,
      &[
        ("name", turn.character_name.as_str()),
        ("personality", turn.personality.as_str()),
        ("stance", turn.current_stance.as_str()),
        ("resistance", resistance.as_str()),
        ("language", turn.language.as_str()),
        ("topic", turn.topic.as_str()),
        ("message", turn.message.as_str()),
        ("tone", turn.tone.as_str()),
        ("xp_min", xp_min.as_str()),
        ("xp_max", xp_max.as_str()),
      ],
    );
    let v = self.chat_json(&self.strong_model, &self.prompts.evaluate_system, &user, 0.8).await?;
    Ok(RawEvaluation::from_json(&v))
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extracts_error_message() {
    let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Incorrect API key provided"));
    assert_eq!(extract_openai_error("<html>bad gateway</html>"), None);
  }

  #[test]
  fn only_objects_are_accepted() {
    assert!(parse_json_object(" {\"message\": \"Aane\"} ").is_ok());
    assert!(matches!(parse_json_object("[1,2]"), Err(OracleError::Decode(_))));
    assert!(matches!(parse_json_object("Sure! Here is JSON"), Err(OracleError::Decode(_))));
  }

  #[test]
  fn chat_request_serializes_json_mode() {
    let req = ChatCompletionRequest {
      model: "gpt-4o".into(),
      messages: vec![ChatMessageReq { role: "user".into(), content: "hi".into() }],
      temperature: 0.8,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
      max_tokens: None,
    };
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["response_format"]["type"], "json_object");
    assert!(v.get("max_tokens").is_none());
  }
}
