//! Seed data: the default learner, the built-in Ghanaian characters and the
//! local debate-topic bank used when the oracle cannot propose a scenario.

use rand::seq::SliceRandom;

use crate::domain::{Character, Difficulty, NewCharacter, NewUser};
use crate::oracle::Scenario;

/// The single learner account the SPA talks as (id 1 after seeding).
pub fn seed_user() -> NewUser {
  NewUser { username: "learner".into(), avatar: None }
}

/// Built-in characters; always inserted before any TOML bank entries.
pub fn seed_characters() -> Vec<NewCharacter> {
  vec![
    NewCharacter {
      name: "Kwame".into(),
      role: "Traditional Elder".into(),
      location: "Kumasi, Ghana".into(),
      language: "Twi".into(),
      personality: "Wise, traditional, values cultural customs, somewhat skeptical of modern ideas".into(),
      avatar: Some("https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?ixlib=rb-4.0.3&auto=format&fit=crop&w=80&h=80".into()),
      background_context: "Kwame is a respected elder in Kumasi who deeply values Akan traditions. He often has strong opinions about modern vs traditional ways of life.".into(),
      cultural_tips: vec![
        "In Akan culture, respect for elders is paramount".into(),
        "Traditional greetings involve asking about one's health and family".into(),
        "Indirect communication is often preferred to maintain harmony".into(),
      ],
      persuasion_resistance: 70,
      current_stance: "Traditional ways are always better than modern approaches".into(),
      is_active: true,
    },
    NewCharacter {
      name: "Ama".into(),
      role: "University Student".into(),
      location: "Accra, Ghana".into(),
      language: "Ga".into(),
      personality: "Progressive, open-minded, environmentally conscious, eager to debate".into(),
      avatar: Some("https://images.unsplash.com/photo-1494790108755-2616b612b786?ixlib=rb-4.0.3&auto=format&fit=crop&w=80&h=80".into()),
      background_context: "Ama studies environmental science at the University of Ghana. She's passionate about climate action but sometimes has controversial opinions.".into(),
      cultural_tips: vec![
        "Ga people value directness more than other Ghanaian cultures".into(),
        "Academic discussions are highly valued in university settings".into(),
        "Environmental consciousness is growing among young Ghanaians".into(),
      ],
      persuasion_resistance: 40,
      current_stance: "Technology will solve all environmental problems".into(),
      is_active: true,
    },
    NewCharacter {
      name: "Togbe".into(),
      role: "Chief".into(),
      location: "Ho, Ghana".into(),
      language: "Ewe".into(),
      personality: "Diplomatic, thoughtful, believes in community consensus, moderate views".into(),
      avatar: Some("https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?ixlib=rb-4.0.3&auto=format&fit=crop&w=80&h=80".into()),
      background_context: "Togbe is a traditional chief in the Volta Region who balances modern governance with traditional leadership. He values thoughtful discussion.".into(),
      cultural_tips: vec![
        "Ewe culture emphasizes community decision-making".into(),
        "Chiefs are mediators who seek consensus".into(),
        "Patience and careful listening are highly valued".into(),
      ],
      persuasion_resistance: 55,
      current_stance: "All important decisions should be made by community consensus".into(),
      is_active: true,
    },
  ]
}

pub fn topics_for(difficulty: Difficulty) -> &'static [&'static str] {
  match difficulty {
    Difficulty::Beginner => &[
      "Should traditional cooking methods be preserved over modern convenience?",
      "Is it better to live in the city or countryside?",
      "Should children learn traditional languages first?",
    ],
    Difficulty::Intermediate => &[
      "Should Ghana prioritize renewable energy over economic growth?",
      "Is technology making traditional crafts obsolete?",
      "Should education be taught in local languages or English?",
    ],
    Difficulty::Advanced => &[
      "How should Ghana balance cultural preservation with modernization?",
      "What role should traditional leadership play in modern governance?",
      "How can Ghana address climate change while developing economically?",
    ],
  }
}

/// Random topic from the bank; the character keeps its own stance.
pub fn local_scenario(character: &Character, difficulty: Difficulty) -> Scenario {
  let topic = topics_for(difficulty)
    .choose(&mut rand::thread_rng())
    .copied()
    .unwrap_or("General Discussion");
  let ai_stance = if character.current_stance.trim().is_empty() {
    "I have my own opinions on various topics.".to_string()
  } else {
    character.current_stance.clone()
  };
  Scenario {
    topic: topic.to_string(),
    scenario: format!("{} the {} has strong views on this. Persuade them to reconsider.", character.name, character.role),
    ai_stance,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn seeded_characters_cover_three_languages() {
    let langs: Vec<String> = seed_characters().into_iter().map(|c| c.language).collect();
    assert_eq!(langs, vec!["Twi", "Ga", "Ewe"]);
  }

  #[test]
  fn local_scenario_uses_bank_and_stance() {
    let c = seed_characters().remove(0);
    let character = Character {
      id: 1,
      name: c.name,
      role: c.role,
      location: c.location,
      language: c.language,
      personality: c.personality,
      avatar: c.avatar,
      background_context: c.background_context,
      cultural_tips: c.cultural_tips,
      persuasion_resistance: c.persuasion_resistance,
      current_stance: c.current_stance,
      is_active: c.is_active,
    };
    let s = local_scenario(&character, Difficulty::Advanced);
    assert!(topics_for(Difficulty::Advanced).contains(&s.topic.as_str()));
    assert_eq!(s.ai_stance, "Traditional ways are always better than modern approaches");
  }
}
