//! Agent registry
//!
//! The configured bots: identity, display attributes and participation
//! parameters. Read-only once built.

use std::collections::HashSet;
use std::sync::Arc;

use crate::core::config::{BotProfile, BotsConfig};
use crate::core::{AgentId, MultichatError, Result, Temperament};

/// Default participation probability
pub const DEFAULT_PARTICIPATION: f64 = 0.7;

/// Default reply delay bounds in milliseconds, `[min, max)`
pub const DEFAULT_DELAY_MS: (u64, u64) = (500, 2500);

/// Reply delay bounds in milliseconds, lower inclusive, upper exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self> {
        if min_ms > max_ms {
            return Err(MultichatError::config(format!(
                "delay range [{}, {}) is inverted",
                min_ms, max_ms
            )));
        }
        Ok(Self { min_ms, max_ms })
    }

    pub fn is_constant(&self) -> bool {
        self.min_ms == self.max_ms
    }
}

/// One configured bot
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    name: String,
    color: String,
    personality: String,
    temperament: Temperament,
    participation: f64,
    delay: DelayRange,
}

impl Agent {
    /// Create a builder for a bot
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(id, name)
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn personality(&self) -> &str {
        &self.personality
    }

    pub fn temperament(&self) -> Temperament {
        self.temperament
    }

    /// Probability of answering any given message
    pub fn participation(&self) -> f64 {
        self.participation
    }

    pub fn delay(&self) -> DelayRange {
        self.delay
    }

    /// System prompt pinned at the head of this bot's history
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}, {}. You are chatting in a group with a user and a few other \
             assistants.\n\
             1. Your speaking style is {}.\n\
             2. You have your own opinions and feelings; you are not a cold machine.\n\
             3. Keep replies short and natural, like a real friend in a group chat.",
            self.name,
            self.personality,
            self.temperament.style_hint()
        )
    }
}

/// Builder for creating Agents
pub struct AgentBuilder {
    id: String,
    name: String,
    color: String,
    personality: String,
    temperament: Temperament,
    participation: f64,
    delay: (u64, u64),
}

impl AgentBuilder {
    /// Create a new builder with the given identity
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: "#4A90E2".to_string(),
            personality: "a friendly chat companion".to_string(),
            temperament: Temperament::Caring,
            participation: DEFAULT_PARTICIPATION,
            delay: DEFAULT_DELAY_MS,
        }
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn personality(mut self, personality: impl Into<String>) -> Self {
        self.personality = personality.into();
        self
    }

    pub fn temperament(mut self, temperament: Temperament) -> Self {
        self.temperament = temperament;
        self
    }

    /// Set the participation probability, must lie in [0, 1]
    pub fn participation(mut self, p: f64) -> Self {
        self.participation = p;
        self
    }

    /// Set the reply delay range `[min_ms, max_ms)`
    pub fn delay_ms(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.delay = (min_ms, max_ms);
        self
    }

    /// Validate and build the Agent
    pub fn build(self) -> Result<Agent> {
        if self.id.trim().is_empty() {
            return Err(MultichatError::config("agent id must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.participation) {
            return Err(MultichatError::config(format!(
                "participation {} for '{}' is outside [0, 1]",
                self.participation, self.id
            )));
        }

        Ok(Agent {
            id: AgentId::new(self.id),
            name: self.name,
            color: self.color,
            personality: self.personality,
            temperament: self.temperament,
            participation: self.participation,
            delay: DelayRange::new(self.delay.0, self.delay.1)?,
        })
    }
}

/// Registry of configured bots
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<Arc<Agent>>,
}

impl AgentRegistry {
    /// Build a registry, rejecting duplicate ids
    pub fn new(agents: Vec<Agent>) -> Result<Self> {
        let mut seen = HashSet::new();
        for agent in &agents {
            if !seen.insert(agent.id().clone()) {
                return Err(MultichatError::config(format!(
                    "duplicate agent id '{}'",
                    agent.id()
                )));
            }
        }

        Ok(Self {
            agents: agents.into_iter().map(Arc::new).collect(),
        })
    }

    /// Build the registry from the active part of the roster
    pub fn from_config(config: &BotsConfig) -> Result<Self> {
        let agents = config
            .active_profiles()
            .iter()
            .map(|profile| Self::agent_from_profile(profile, config))
            .collect::<Result<Vec<_>>>()?;

        Self::new(agents)
    }

    fn agent_from_profile(profile: &BotProfile, defaults: &BotsConfig) -> Result<Agent> {
        Agent::builder(&profile.id, &profile.name)
            .color(&profile.color)
            .personality(&profile.personality)
            .temperament(profile.temperament)
            .participation(profile.participation.unwrap_or(defaults.participation))
            .delay_ms(
                profile.min_delay_ms.unwrap_or(defaults.min_delay_ms),
                profile.max_delay_ms.unwrap_or(defaults.max_delay_ms),
            )
            .build()
    }

    /// Look up a bot by id
    pub fn get(&self, id: &AgentId) -> Option<&Arc<Agent>> {
        self.agents.iter().find(|a| a.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Agent>> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_builder_defaults() {
        let agent = Agent::builder("bot_9", "Nine").build().unwrap();
        assert_eq!(agent.participation(), 0.7);
        assert_eq!(agent.delay(), DelayRange::new(500, 2500).unwrap());
        assert!(agent.system_prompt().contains("Nine"));
    }

    #[test]
    fn test_invalid_agents_rejected() {
        assert!(Agent::builder("a", "A").participation(1.5).build().is_err());
        assert!(Agent::builder("a", "A").participation(-0.1).build().is_err());
        assert!(Agent::builder("a", "A").delay_ms(10, 5).build().is_err());
        assert!(Agent::builder(" ", "A").build().is_err());
        assert!(Agent::builder("a", "A").delay_ms(0, 0).build().is_ok());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let a = Agent::builder("same", "A").build().unwrap();
        let b = Agent::builder("same", "B").build().unwrap();
        assert!(AgentRegistry::new(vec![a, b]).is_err());
    }

    #[test]
    fn test_from_config() {
        let mut bots = BotsConfig::default();
        bots.count = 4;
        bots.roster[1].participation = Some(0.2);
        let registry = AgentRegistry::from_config(&bots).unwrap();

        assert_eq!(registry.len(), 4);
        let second = registry.get(&AgentId::new("bot_1")).unwrap();
        assert_eq!(second.participation(), 0.2);
        assert_eq!(second.color(), "#4A90E2");
        assert!(registry.get(&AgentId::new("bot_4")).is_none());
    }
}
