//! Conversation progress engine.
//!
//! Owns the round state machine: a user message is judged by the oracle, then
//! the round (both messages, progress, persuasion score, XP, completion and
//! the first-round achievement) is committed in one unit of work.
//!
//! Rounds on the same conversation are serialised by a per-conversation lock
//! held across the oracle call and the commit; the store additionally refuses
//! a commit whose progress moved underneath it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::config::GameSettings;
use crate::domain::{
  Achievement, Character, CharacterId, Conversation, ConversationId, Difficulty, Message,
  NewAchievement, NewConversation, NewMessage, Sender, Tone, User, UserId, CONVERSATION_STARTER,
};
use crate::error::AppError;
use crate::oracle::{Evaluation, ScoringOracle, TurnContext};
use crate::seeds::local_scenario;
use crate::store::{RoundCommit, Store};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
  pub user_message: Message,
  pub ai_message: Message,
  pub conversation: Conversation,
  pub should_end_conversation: bool,
  pub achievement: Option<Achievement>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
  pub conversation: Conversation,
  pub messages: Vec<Message>,
  pub character: Option<Character>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
  pub total_conversations: usize,
  pub completed_conversations: usize,
  pub total_achievements: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserProfile {
  pub user: User,
  pub stats: UserStats,
}

/// Conversation state after one judged round. Completion is sticky.
pub fn advance(conversation: &Conversation, eval: &Evaluation) -> Conversation {
  let mut next = conversation.clone();
  next.progress += 1;
  next.persuasion_score += i64::from(eval.persuasion_change);
  next.xp_earned += i64::from(eval.xp_awarded);
  next.is_completed = conversation.is_completed
    || next.progress >= next.total_rounds
    || eval.should_end_conversation;
  next
}

fn starter_achievement(user_id: UserId, character: &Character, xp_reward: i32) -> NewAchievement {
  NewAchievement {
    user_id,
    kind: CONVERSATION_STARTER.into(),
    title: "Conversation Starter!".into(),
    description: format!("You successfully started your first conversation with {}!", character.name),
    xp_reward,
  }
}

pub struct ConversationEngine {
  store: Arc<dyn Store>,
  oracle: Arc<dyn ScoringOracle>,
  settings: GameSettings,
  locks: Mutex<HashMap<ConversationId, Arc<Mutex<()>>>>,
}

impl ConversationEngine {
  pub fn new(store: Arc<dyn Store>, oracle: Arc<dyn ScoringOracle>, settings: GameSettings) -> Self {
    Self { store, oracle, settings, locks: Mutex::new(HashMap::new()) }
  }

  pub fn oracle_name(&self) -> &'static str { self.oracle.name() }

  async fn conversation_lock(&self, id: ConversationId) -> Arc<Mutex<()>> {
    self.locks.lock().await.entry(id).or_default().clone()
  }

  /// Drops the map entry once no other round holds or waits on it. Clones are
  /// only taken under the map lock, so the count cannot grow while we check.
  async fn release_lock(&self, id: ConversationId, lock: Arc<Mutex<()>>) {
    let mut locks = self.locks.lock().await;
    if Arc::strong_count(&lock) == 2 {
      locks.remove(&id);
    }
  }

  async fn load_conversation(&self, id: ConversationId) -> Result<Conversation, AppError> {
    self.store.get_conversation(id).await?.ok_or_else(|| AppError::not_found("conversation", id))
  }

  #[instrument(level = "info", skip(self, title), fields(%difficulty))]
  pub async fn create_conversation(
    &self,
    user_id: UserId,
    character_id: CharacterId,
    difficulty: Difficulty,
    title: Option<String>,
  ) -> Result<Conversation, AppError> {
    if self.store.get_user(user_id).await?.is_none() {
      return Err(AppError::not_found("user", user_id));
    }
    let character = self
      .store
      .get_character(character_id)
      .await?
      .ok_or_else(|| AppError::not_found("character", character_id))?;

    let scenario = match self.oracle.generate_scenario(&character, difficulty).await {
      Ok(s) => s,
      Err(e) => {
        warn!(target: "conversation", oracle = self.oracle.name(), error = %e, "Scenario generation failed; using local topic bank");
        local_scenario(&character, difficulty)
      }
    };

    let title = title
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty())
      .unwrap_or_else(|| "Persuasion Challenge".into());

    let conversation = self
      .store
      .create_conversation(NewConversation {
        user_id,
        character_id,
        title,
        topic: scenario.topic,
        scenario: scenario.scenario,
        ai_stance: scenario.ai_stance,
        difficulty,
        total_rounds: self.settings.total_rounds,
      })
      .await?;

    info!(target: "conversation", id = conversation.id, character = %character.name, topic = %conversation.topic, "Conversation created");
    Ok(conversation)
  }

  /// One round: judge the user's message and commit the outcome atomically.
  #[instrument(level = "info", skip(self, content), fields(content_len = content.len(), %tone))]
  pub async fn submit_message(
    &self,
    conversation_id: ConversationId,
    user_id: Option<UserId>,
    content: &str,
    tone: Tone,
  ) -> Result<SubmitOutcome, AppError> {
    self.load_conversation(conversation_id).await?;
    if content.trim().is_empty() {
      return Err(AppError::validation("message content must not be empty"));
    }

    let lock = self.conversation_lock(conversation_id).await;
    let outcome = {
      let _guard = lock.lock().await;
      self.judge_round(conversation_id, user_id, content, tone).await
    };
    self.release_lock(conversation_id, lock).await;
    outcome
  }

  /// Body of a round; caller holds the conversation's lock.
  async fn judge_round(
    &self,
    conversation_id: ConversationId,
    user_id: Option<UserId>,
    content: &str,
    tone: Tone,
  ) -> Result<SubmitOutcome, AppError> {
    let conversation = self.load_conversation(conversation_id).await?;
    if let Some(uid) = user_id {
      if uid != conversation.user_id {
        return Err(AppError::validation(format!(
          "conversation {} does not belong to user {}",
          conversation_id, uid
        )));
      }
    }
    if conversation.is_completed {
      return Err(AppError::validation(format!("conversation {} is already completed", conversation_id)));
    }
    let character = self
      .store
      .get_character(conversation.character_id)
      .await?
      .ok_or_else(|| AppError::not_found("character", conversation.character_id))?;

    let turn = TurnContext {
      character_name: character.name.clone(),
      personality: character.personality.clone(),
      current_stance: character.current_stance.clone(),
      persuasion_resistance: character.persuasion_resistance,
      language: character.language.clone(),
      topic: conversation.topic.clone(),
      message: content.to_string(),
      tone,
      variant: self.settings.scoring_variant,
    };
    let raw = self.oracle.evaluate(&turn).await.map_err(|e| {
      error!(target: "conversation", conversation_id, oracle = self.oracle.name(), error = %e, "Oracle evaluation failed; nothing committed");
      AppError::Upstream(e)
    })?;
    let eval = Evaluation::from_raw(raw, self.settings.scoring_variant);

    let next = advance(&conversation, &eval);
    let achievement = (next.progress == 1)
      .then(|| starter_achievement(conversation.user_id, &character, self.settings.starter_achievement_xp));

    let committed = self
      .store
      .commit_round(RoundCommit {
        conversation: next,
        expected_progress: conversation.progress,
        user_message: NewMessage {
          sender: Sender::User,
          content: content.to_string(),
          tone: Some(tone),
          persuasion_strength: None,
          translation_accuracy: None,
          cultural_appropriateness: None,
          persuasion_change: None,
          ai_response: None,
          cultural_context: None,
          xp_awarded: 0,
        },
        ai_message: NewMessage {
          sender: Sender::Ai,
          content: eval.message.clone(),
          tone: None,
          persuasion_strength: Some(eval.persuasion_strength),
          translation_accuracy: Some(eval.translation_accuracy),
          cultural_appropriateness: Some(eval.cultural_appropriateness),
          persuasion_change: Some(eval.persuasion_change),
          ai_response: Some(eval.feedback.clone()),
          cultural_context: eval.cultural_context.clone(),
          xp_awarded: eval.xp_awarded,
        },
        user_xp_delta: i64::from(eval.xp_awarded),
        achievement,
      })
      .await?;

    let c = &committed.conversation;
    info!(
      target: "conversation",
      conversation_id,
      progress = c.progress,
      total_rounds = c.total_rounds,
      persuasion_change = eval.persuasion_change,
      persuasion_score = c.persuasion_score,
      xp = eval.xp_awarded,
      completed = c.is_completed,
      "Round accepted"
    );
    if let Some(a) = &committed.achievement {
      info!(target: "conversation", user_id = a.user_id, kind = %a.kind, xp_reward = a.xp_reward, "Achievement unlocked");
    }
    Ok(SubmitOutcome {
      user_message: committed.user_message,
      ai_message: committed.ai_message,
      conversation: committed.conversation,
      should_end_conversation: eval.should_end_conversation,
      achievement: committed.achievement,
    })
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn conversation_detail(&self, id: ConversationId) -> Result<ConversationDetail, AppError> {
    let conversation = self.load_conversation(id).await?;
    let messages = self.store.conversation_messages(id).await?;
    let character = self.store.get_character(conversation.character_id).await?;
    Ok(ConversationDetail { conversation, messages, character })
  }

  pub async fn list_characters(&self) -> Result<Vec<Character>, AppError> {
    Ok(self.store.list_characters().await?)
  }

  pub async fn character(&self, id: CharacterId) -> Result<Character, AppError> {
    self.store.get_character(id).await?.ok_or_else(|| AppError::not_found("character", id))
  }

  async fn user(&self, id: UserId) -> Result<User, AppError> {
    self.store.get_user(id).await?.ok_or_else(|| AppError::not_found("user", id))
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn user_profile(&self, id: UserId) -> Result<UserProfile, AppError> {
    let user = self.user(id).await?;
    let conversations = self.store.user_conversations(id).await?;
    let achievements = self.store.user_achievements(id).await?;
    let stats = UserStats {
      total_conversations: conversations.len(),
      completed_conversations: conversations.iter().filter(|c| c.is_completed).count(),
      total_achievements: achievements.len(),
    };
    Ok(UserProfile { user, stats })
  }

  pub async fn user_achievements(&self, id: UserId) -> Result<Vec<Achievement>, AppError> {
    self.user(id).await?;
    Ok(self.store.user_achievements(id).await?)
  }

  pub async fn user_conversations(&self, id: UserId) -> Result<Vec<Conversation>, AppError> {
    self.user(id).await?;
    Ok(self.store.user_conversations(id).await?)
  }
}
