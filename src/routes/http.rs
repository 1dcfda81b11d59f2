//! HTTP endpoint handlers. These are thin wrappers that forward to the engine.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{FromRequest, FromRequestParts, Path, State},
  Json,
};
use tracing::{info, instrument};

use crate::domain::{CharacterId, ConversationId, Difficulty, UserId};
use crate::engine::{ConversationDetail, SubmitOutcome, UserProfile};
use crate::error::AppError;
use crate::protocol::*;
use crate::state::AppState;

/// `Json` whose rejection is an `AppError`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Path` whose rejection is an `AppError`.
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> Json<HealthOut> {
  Json(HealthOut { ok: true, oracle: state.engine.oracle_name() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_characters(
  State(state): State<Arc<AppState>>,
) -> Result<Json<CharactersOut>, AppError> {
  let characters = state.engine.list_characters().await?;
  Ok(Json(CharactersOut { characters }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_character(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<CharacterId>,
) -> Result<Json<CharacterOut>, AppError> {
  let character = state.engine.character(id).await?;
  Ok(Json(CharacterOut { character }))
}

#[instrument(level = "info", skip(state, body), fields(user_id = body.user_id, character_id = body.character_id, difficulty = %body.difficulty))]
pub async fn http_create_conversation(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<CreateConversationIn>,
) -> Result<Json<ConversationOut>, AppError> {
  let difficulty: Difficulty = body.difficulty.parse().map_err(AppError::Validation)?;
  let conversation = state
    .engine
    .create_conversation(body.user_id, body.character_id, difficulty, body.title)
    .await?;
  info!(target: "conversation", id = conversation.id, "HTTP conversation created");
  Ok(Json(ConversationOut { conversation }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_conversation(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<ConversationId>,
) -> Result<Json<ConversationDetail>, AppError> {
  Ok(Json(state.engine.conversation_detail(id).await?))
}

#[instrument(level = "info", skip(state, body), fields(content_len = body.content.len(), tone = %body.tone))]
pub async fn http_post_message(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<ConversationId>,
  ApiJson(body): ApiJson<SendMessageIn>,
) -> Result<Json<SubmitOutcome>, AppError> {
  let out = state
    .engine
    .submit_message(id, body.user_id, &body.content, body.tone)
    .await?;
  info!(target: "conversation", id, progress = out.conversation.progress, ended = out.should_end_conversation, achievement = out.achievement.is_some(), "HTTP round judged");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len(), target = %body.target_language))]
pub async fn http_post_translate(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<TranslateIn>,
) -> Result<Json<TranslateOut>, AppError> {
  if body.text.trim().is_empty() {
    return Err(AppError::validation("text must not be empty"));
  }
  let translation = state
    .translator
    .translate(&body.text, body.source_language.as_deref(), &body.target_language);
  Ok(Json(TranslateOut { translation }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_user(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<UserId>,
) -> Result<Json<UserProfile>, AppError> {
  Ok(Json(state.engine.user_profile(id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_user_achievements(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<UserId>,
) -> Result<Json<AchievementsOut>, AppError> {
  let achievements = state.engine.user_achievements(id).await?;
  Ok(Json(AchievementsOut { achievements }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_user_conversations(
  State(state): State<Arc<AppState>>,
  ApiPath(id): ApiPath<UserId>,
) -> Result<Json<ConversationsOut>, AppError> {
  let conversations = state.engine.user_conversations(id).await?;
  Ok(Json(ConversationsOut { conversations }))
}
