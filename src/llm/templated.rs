//! Offline templated replies
//!
//! Picks one of a handful of temperament-specific templates around the
//! user's message. Useful without an API key and in tests.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agent::Agent;
use crate::core::{Result, Temperament, Turn};
use crate::llm::traits::ResponseGenerator;

/// Template-based generator
pub struct TemplatedGenerator {
    rng: Mutex<StdRng>,
}

impl TemplatedGenerator {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    fn templates(temperament: Temperament, message: &str) -> Vec<String> {
        match temperament {
            Temperament::Playful => vec![
                format!("Wow! {}, what a fun topic~", message),
                format!("Hehe, let me think... about {}, I have so many ideas!", message),
                format!("Oh my, \"{}\" is really great!", message),
                "Hmm... I think this is super interesting!".to_string(),
            ],
            Temperament::Analytical => vec![
                format!("From a technical angle, {} deserves a closer look.", message),
                format!("Let me break it down: {} touches several layers.", message),
                format!("About {}, I'd suggest thinking of it this way...", message),
                format!("Good question! The core of {} is...", message),
            ],
            Temperament::Poetic => vec![
                format!("{}... what a poetic thing to say~", message),
                format!("Your words remind me of a verse: {}, like a painting.", message),
                format!("Artistically speaking, {} is full of beauty.", message),
                format!("Lovely! {} lets me feel the power of words.", message),
            ],
            Temperament::Humorous => vec![
                format!("Hahaha! {}? That reminds me of a joke...", message),
                format!("You know what? {} is actually pretty funny, haha!", message),
                format!("Hey! About {}, I've got a bit for that~", message),
                format!("I'm dying! {} is too good!", message),
            ],
            Temperament::Caring => vec![
                format!("I hear you. {} sounds like it matters to you.", message),
                format!("Thanks for sharing {} with us, tell me more?", message),
                format!("That makes sense. How do you feel about {}?", message),
            ],
        }
    }
}

#[async_trait]
impl ResponseGenerator for TemplatedGenerator {
    async fn generate(&self, agent: &Agent, _history: &[Turn], message: &str) -> Result<String> {
        let mut templates = Self::templates(agent.temperament(), message);
        let index = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.random_range(0..templates.len())
        };
        Ok(templates.swap_remove(index))
    }

    fn name(&self) -> &str {
        "templated"
    }
}
