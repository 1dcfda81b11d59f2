//! Application state: storage, oracle, engine and translator.
//!
//! This module owns startup wiring:
//!   - the in-memory store, seeded with the learner, built-in characters and
//!     any extra characters from the TOML bank
//!   - the scoring oracle (OpenAI when OPENAI_API_KEY is set, local otherwise)
//!   - the conversation engine with game settings from config
//!   - the phrase translator

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::{load_agent_config_from_env, AgentConfig};
use crate::engine::ConversationEngine;
use crate::error::StoreError;
use crate::openai::OpenAI;
use crate::oracle::{LocalOracle, ScoringOracle};
use crate::seeds::{seed_characters, seed_user};
use crate::store::{MemStore, Store};
use crate::translate::PhraseTranslator;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("translator tables failed to compile: {0}")]
    Translator(#[from] regex::Error),
    #[error("seeding failed: {0}")]
    Seed(#[from] StoreError),
}

pub struct AppState {
    pub engine: ConversationEngine,
    pub translator: Arc<PhraseTranslator>,
}

impl AppState {
    /// Build state from env: load config, init oracle, seed the store.
    #[instrument(level = "info", skip_all)]
    pub async fn from_env() -> Result<Self, StartupError> {
        let cfg = load_agent_config_from_env().unwrap_or_default();
        let translator = Arc::new(PhraseTranslator::new()?);

        let oracle: Arc<dyn ScoringOracle> = match OpenAI::from_env(cfg.prompts.clone()) {
            Some(oa) => {
                info!(target: "kasa_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "OpenAI enabled.");
                Arc::new(oa)
            }
            None => {
                warn!(target: "kasa_backend", "OpenAI disabled (no OPENAI_API_KEY). Using local scoring.");
                Arc::new(LocalOracle::new(translator.clone()))
            }
        };

        let store: Arc<dyn Store> = Arc::new(MemStore::new());
        seed_store(store.as_ref(), &cfg).await?;

        Ok(Self::with_parts(store, oracle, translator, cfg))
    }

    pub fn with_parts(
        store: Arc<dyn Store>,
        oracle: Arc<dyn ScoringOracle>,
        translator: Arc<PhraseTranslator>,
        cfg: AgentConfig,
    ) -> Self {
        info!(target: "kasa_backend", total_rounds = cfg.game.total_rounds, variant = ?cfg.game.scoring_variant, oracle = oracle.name(), "Engine configured");
        Self {
            engine: ConversationEngine::new(store, oracle, cfg.game),
            translator,
        }
    }
}

/// Learner first (id 1), then built-in characters, then the TOML bank.
pub async fn seed_store(store: &dyn Store, cfg: &AgentConfig) -> Result<(), StoreError> {
    let user = store.create_user(seed_user()).await?;
    for c in seed_characters().into_iter().chain(cfg.characters.iter().cloned()) {
        store.create_character(c).await?;
    }
    let characters = store.list_characters().await?;
    info!(target: "kasa_backend", user_id = user.id, characters = characters.len(), bank = cfg.characters.len(), "Store seeded");
    Ok(())
}
