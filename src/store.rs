//! Storage interface and the in-memory backend.
//!
//! The engine only talks to `Store`, so a relational backend can be dropped in
//! without touching it. `MemStore` keeps every table behind ONE lock: a round
//! (two messages, conversation update, XP, optional achievement) is applied
//! while holding the write guard, which makes `commit_round` all-or-nothing.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::{
  Achievement, Character, CharacterId, Conversation, ConversationId, Message, NewAchievement,
  NewCharacter, NewConversation, NewMessage, NewUser, User, UserId,
};
use crate::error::StoreError;

/// Everything one accepted round writes.
#[derive(Clone, Debug)]
pub struct RoundCommit {
  /// Conversation state after the round (progress, score, xp, completion).
  pub conversation: Conversation,
  /// Progress the engine read before calling the oracle; the commit is
  /// refused if the stored row moved in the meantime.
  pub expected_progress: i32,
  pub user_message: NewMessage,
  pub ai_message: NewMessage,
  pub user_xp_delta: i64,
  pub achievement: Option<NewAchievement>,
}

#[derive(Clone, Debug)]
pub struct CommittedRound {
  pub user_message: Message,
  pub ai_message: Message,
  pub conversation: Conversation,
  pub achievement: Option<Achievement>,
}

#[async_trait]
pub trait Store: Send + Sync {
  async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;
  async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

  /// Active characters only.
  async fn list_characters(&self) -> Result<Vec<Character>, StoreError>;
  async fn get_character(&self, id: CharacterId) -> Result<Option<Character>, StoreError>;
  async fn create_character(&self, character: NewCharacter) -> Result<Character, StoreError>;

  async fn get_conversation(&self, id: ConversationId) -> Result<Option<Conversation>, StoreError>;
  async fn user_conversations(&self, user_id: UserId) -> Result<Vec<Conversation>, StoreError>;
  async fn create_conversation(&self, conversation: NewConversation) -> Result<Conversation, StoreError>;

  /// Messages of one conversation, oldest first.
  async fn conversation_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>, StoreError>;

  async fn user_achievements(&self, user_id: UserId) -> Result<Vec<Achievement>, StoreError>;

  /// Apply a whole round or nothing.
  async fn commit_round(&self, round: RoundCommit) -> Result<CommittedRound, StoreError>;
}

/// Auto-increment id source, one per table. Ids start at 1.
#[derive(Debug)]
struct IdSequence(i64);

impl Default for IdSequence {
  fn default() -> Self { IdSequence(1) }
}

impl IdSequence {
  fn next(&mut self) -> i64 {
    let id = self.0;
    self.0 += 1;
    id
  }
}

#[derive(Default)]
struct Tables {
  users: BTreeMap<UserId, User>,
  characters: BTreeMap<CharacterId, Character>,
  conversations: BTreeMap<ConversationId, Conversation>,
  messages: BTreeMap<i64, Message>,
  achievements: BTreeMap<i64, Achievement>,

  user_ids: IdSequence,
  character_ids: IdSequence,
  conversation_ids: IdSequence,
  message_ids: IdSequence,
  achievement_ids: IdSequence,
}

impl Tables {
  fn insert_message(&mut self, conversation_id: ConversationId, m: NewMessage) -> Message {
    let id = self.message_ids.next();
    let message = Message {
      id,
      conversation_id,
      sender: m.sender,
      content: m.content,
      tone: m.tone,
      persuasion_strength: m.persuasion_strength,
      translation_accuracy: m.translation_accuracy,
      cultural_appropriateness: m.cultural_appropriateness,
      persuasion_change: m.persuasion_change,
      ai_response: m.ai_response,
      cultural_context: m.cultural_context,
      xp_awarded: m.xp_awarded,
      timestamp: Utc::now(),
    };
    self.messages.insert(id, message.clone());
    message
  }
}

#[derive(Default)]
pub struct MemStore {
  tables: RwLock<Tables>,
}

impl MemStore {
  pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl Store for MemStore {
  async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
    Ok(self.tables.read().await.users.get(&id).cloned())
  }

  #[instrument(level = "debug", skip(self, user), fields(username = %user.username))]
  async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
    let mut t = self.tables.write().await;
    let id = t.user_ids.next();
    let user = User {
      id,
      username: user.username,
      streak: 0,
      hearts: 5,
      total_xp: 0,
      level: 1,
      avatar: user.avatar,
      created_at: Utc::now(),
    };
    t.users.insert(id, user.clone());
    Ok(user)
  }

  async fn list_characters(&self) -> Result<Vec<Character>, StoreError> {
    let t = self.tables.read().await;
    Ok(t.characters.values().filter(|c| c.is_active).cloned().collect())
  }

  async fn get_character(&self, id: CharacterId) -> Result<Option<Character>, StoreError> {
    Ok(self.tables.read().await.characters.get(&id).cloned())
  }

  #[instrument(level = "debug", skip(self, character), fields(name = %character.name))]
  async fn create_character(&self, character: NewCharacter) -> Result<Character, StoreError> {
    let mut t = self.tables.write().await;
    let id = t.character_ids.next();
    let character = Character {
      id,
      name: character.name,
      role: character.role,
      location: character.location,
      language: character.language,
      personality: character.personality,
      avatar: character.avatar,
      background_context: character.background_context,
      cultural_tips: character.cultural_tips,
      persuasion_resistance: character.persuasion_resistance.clamp(0, 100),
      current_stance: character.current_stance,
      is_active: character.is_active,
    };
    t.characters.insert(id, character.clone());
    Ok(character)
  }

  async fn get_conversation(&self, id: ConversationId) -> Result<Option<Conversation>, StoreError> {
    Ok(self.tables.read().await.conversations.get(&id).cloned())
  }

  async fn user_conversations(&self, user_id: UserId) -> Result<Vec<Conversation>, StoreError> {
    let t = self.tables.read().await;
    Ok(t.conversations.values().filter(|c| c.user_id == user_id).cloned().collect())
  }

  #[instrument(level = "debug", skip(self, conversation), fields(user_id = conversation.user_id, character_id = conversation.character_id))]
  async fn create_conversation(&self, conversation: NewConversation) -> Result<Conversation, StoreError> {
    let mut t = self.tables.write().await;
    if !t.users.contains_key(&conversation.user_id) {
      return Err(StoreError::Missing { entity: "user", id: conversation.user_id });
    }
    if !t.characters.contains_key(&conversation.character_id) {
      return Err(StoreError::Missing { entity: "character", id: conversation.character_id });
    }
    let id = t.conversation_ids.next();
    let conversation = Conversation {
      id,
      user_id: conversation.user_id,
      character_id: conversation.character_id,
      title: conversation.title,
      topic: conversation.topic,
      scenario: conversation.scenario,
      ai_stance: conversation.ai_stance,
      difficulty: conversation.difficulty,
      progress: 0,
      total_rounds: conversation.total_rounds,
      persuasion_score: 0,
      xp_earned: 0,
      is_completed: false,
      created_at: Utc::now(),
    };
    t.conversations.insert(id, conversation.clone());
    Ok(conversation)
  }

  async fn conversation_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>, StoreError> {
    let t = self.tables.read().await;
    let mut out: Vec<Message> = t
      .messages
      .values()
      .filter(|m| m.conversation_id == conversation_id)
      .cloned()
      .collect();
    // Ids already follow insertion order; timestamps can tie within a round.
    out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
    Ok(out)
  }

  async fn user_achievements(&self, user_id: UserId) -> Result<Vec<Achievement>, StoreError> {
    let t = self.tables.read().await;
    Ok(t.achievements.values().filter(|a| a.user_id == user_id).cloned().collect())
  }

  #[instrument(level = "debug", skip(self, round), fields(conversation_id = round.conversation.id, expected_progress = round.expected_progress))]
  async fn commit_round(&self, round: RoundCommit) -> Result<CommittedRound, StoreError> {
    let mut t = self.tables.write().await;
    let conversation_id = round.conversation.id;
    let user_id = round.conversation.user_id;

    // All checks first; nothing below can fail.
    let stored = t
      .conversations
      .get(&conversation_id)
      .ok_or(StoreError::Missing { entity: "conversation", id: conversation_id })?;
    if stored.progress != round.expected_progress {
      return Err(StoreError::Conflict {
        id: conversation_id,
        expected: round.expected_progress,
        found: stored.progress,
      });
    }
    if !t.users.contains_key(&user_id) {
      return Err(StoreError::Missing { entity: "user", id: user_id });
    }

    let user_message = t.insert_message(conversation_id, round.user_message);
    let ai_message = t.insert_message(conversation_id, round.ai_message);

    t.conversations.insert(conversation_id, round.conversation.clone());
    if let Some(user) = t.users.get_mut(&user_id) {
      user.total_xp += round.user_xp_delta;
    }

    let achievement = round.achievement.map(|a| {
      let id = t.achievement_ids.next();
      let achievement = Achievement {
        id,
        user_id: a.user_id,
        kind: a.kind,
        title: a.title,
        description: a.description,
        xp_reward: a.xp_reward,
        unlocked_at: Utc::now(),
      };
      t.achievements.insert(id, achievement.clone());
      achievement
    });

    debug!(target: "conversation", conversation_id, progress = round.conversation.progress, "Round committed");
    Ok(CommittedRound { user_message, ai_message, conversation: round.conversation, achievement })
  }
}

#[cfg(test)]
impl MemStore {
  pub(crate) async fn remove_character(&self, id: CharacterId) {
    self.tables.write().await.characters.remove(&id);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Difficulty, Sender, Tone};

  fn character() -> NewCharacter {
    NewCharacter {
      name: "Kwame".into(),
      role: "Traditional Elder".into(),
      location: "Kumasi, Ghana".into(),
      language: "Twi".into(),
      personality: "Wise".into(),
      avatar: None,
      background_context: String::new(),
      cultural_tips: vec![],
      persuasion_resistance: 70,
      current_stance: "Tradition first".into(),
      is_active: true,
    }
  }

  fn text(sender: Sender, content: &str) -> NewMessage {
    NewMessage {
      sender,
      content: content.into(),
      tone: if sender == Sender::User { Some(Tone::Polite) } else { None },
      persuasion_strength: None,
      translation_accuracy: None,
      cultural_appropriateness: None,
      persuasion_change: None,
      ai_response: None,
      cultural_context: None,
      xp_awarded: 0,
    }
  }

  async fn seeded() -> (MemStore, Conversation) {
    let store = MemStore::new();
    let user = store.create_user(NewUser { username: "learner".into(), avatar: None }).await.unwrap();
    let ch = store.create_character(character()).await.unwrap();
    let conv = store
      .create_conversation(NewConversation {
        user_id: user.id,
        character_id: ch.id,
        title: "Persuasion Challenge".into(),
        topic: "t".into(),
        scenario: "s".into(),
        ai_stance: "a".into(),
        difficulty: Difficulty::Beginner,
        total_rounds: 5,
      })
      .await
      .unwrap();
    (store, conv)
  }

  #[tokio::test]
  async fn ids_auto_increment_from_one() {
    let store = MemStore::new();
    let a = store.create_user(NewUser { username: "a".into(), avatar: None }).await.unwrap();
    let b = store.create_user(NewUser { username: "b".into(), avatar: None }).await.unwrap();
    assert_eq!((a.id, b.id), (1, 2));
    assert_eq!(a.hearts, 5);
    assert_eq!(a.level, 1);
  }

  #[tokio::test]
  async fn inactive_characters_are_not_listed() {
    let store = MemStore::new();
    store.create_character(character()).await.unwrap();
    let mut hidden = character();
    hidden.is_active = false;
    let hidden = store.create_character(hidden).await.unwrap();
    let listed = store.list_characters().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(store.get_character(hidden.id).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn conversation_requires_known_user_and_character() {
    let store = MemStore::new();
    let err = store
      .create_conversation(NewConversation {
        user_id: 42,
        character_id: 1,
        title: String::new(),
        topic: String::new(),
        scenario: String::new(),
        ai_stance: String::new(),
        difficulty: Difficulty::Advanced,
        total_rounds: 5,
      })
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::Missing { entity: "user", id: 42 }));
  }

  #[tokio::test]
  async fn commit_round_writes_everything() {
    let (store, conv) = seeded().await;
    let mut next = conv.clone();
    next.progress = 1;
    next.xp_earned = 30;
    let committed = store
      .commit_round(RoundCommit {
        conversation: next,
        expected_progress: 0,
        user_message: text(Sender::User, "Me dwene sɛ"),
        ai_message: text(Sender::Ai, "Dabi"),
        user_xp_delta: 30,
        achievement: Some(NewAchievement {
          user_id: conv.user_id,
          kind: "conversation_starter".into(),
          title: "Conversation Starter!".into(),
          description: String::new(),
          xp_reward: 50,
        }),
      })
      .await
      .unwrap();

    assert_eq!(committed.user_message.id, 1);
    assert_eq!(committed.ai_message.id, 2);
    let msgs = store.conversation_messages(conv.id).await.unwrap();
    assert_eq!(msgs.iter().map(|m| m.sender).collect::<Vec<_>>(), vec![Sender::User, Sender::Ai]);
    assert_eq!(store.get_conversation(conv.id).await.unwrap().unwrap().progress, 1);
    assert_eq!(store.get_user(conv.user_id).await.unwrap().unwrap().total_xp, 30);
    assert_eq!(store.user_achievements(conv.user_id).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn stale_commit_is_refused_without_writes() {
    let (store, conv) = seeded().await;
    let mut next = conv.clone();
    next.progress = 1;
    let err = store
      .commit_round(RoundCommit {
        conversation: next,
        expected_progress: 3,
        user_message: text(Sender::User, "hi"),
        ai_message: text(Sender::Ai, "hello"),
        user_xp_delta: 10,
        achievement: None,
      })
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { expected: 3, found: 0, .. }));
    assert!(store.conversation_messages(conv.id).await.unwrap().is_empty());
    assert_eq!(store.get_user(conv.user_id).await.unwrap().unwrap().total_xp, 0);
  }
}
