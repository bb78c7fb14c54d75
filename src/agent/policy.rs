//! Participation policy
//!
//! Decides, per bot per message, whether the bot answers and how long it
//! waits first. The random source is owned by the policy so a seeded
//! generator makes every decision reproducible.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agent::registry::Agent;

/// Outcome of a participation draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub participates: bool,
    pub delay_ms: u64,
}

impl Decision {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Bernoulli participation plus uniform delay
#[derive(Debug, Clone)]
pub struct ParticipationPolicy {
    rng: StdRng,
}

impl ParticipationPolicy {
    /// Policy with an explicit random source
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    /// Reproducible policy
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Policy seeded from the operating system
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Draw a decision for `agent`.
    ///
    /// Both values are always drawn so the stream of draws does not depend
    /// on earlier outcomes. Total: never fails.
    pub fn decide(&mut self, agent: &Agent, _message: &str) -> Decision {
        let participates = self.rng.random_bool(agent.participation().clamp(0.0, 1.0));

        let range = agent.delay();
        let delay_ms = if range.is_constant() {
            range.min_ms
        } else {
            self.rng.random_range(range.min_ms..range.max_ms)
        };

        Decision {
            participates,
            delay_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(p: f64, min: u64, max: u64) -> Agent {
        Agent::builder("bot", "Bot")
            .participation(p)
            .delay_ms(min, max)
            .build()
            .unwrap()
    }

    #[test]
    fn test_seeded_policy_is_deterministic() {
        let bot = agent(0.7, 500, 2500);
        let mut a = ParticipationPolicy::seeded(42);
        let mut b = ParticipationPolicy::seeded(42);

        let first: Vec<_> = (0..200).map(|_| a.decide(&bot, "hi")).collect();
        let second: Vec<_> = (0..200).map(|_| b.decide(&bot, "hi")).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_delay_within_bounds() {
        let bot = agent(0.7, 500, 2500);
        let mut policy = ParticipationPolicy::seeded(7);
        for _ in 0..5_000 {
            let d = policy.decide(&bot, "hi");
            assert!((500..2500).contains(&d.delay_ms), "delay {}", d.delay_ms);
        }
    }

    #[test]
    fn test_constant_and_zero_delay() {
        let mut policy = ParticipationPolicy::seeded(1);
        let fixed = agent(1.0, 800, 800);
        let instant = agent(1.0, 0, 0);
        for _ in 0..50 {
            assert_eq!(policy.decide(&fixed, "x").delay_ms, 800);
            assert_eq!(policy.decide(&instant, "x").delay(), Duration::ZERO);
        }
    }

    #[test]
    fn test_extreme_probabilities() {
        let mut policy = ParticipationPolicy::seeded(3);
        let always = agent(1.0, 0, 10);
        let never = agent(0.0, 0, 10);
        for _ in 0..500 {
            assert!(policy.decide(&always, "x").participates);
            assert!(!policy.decide(&never, "x").participates);
        }
    }

    #[test]
    fn test_participation_rate() {
        let bots: Vec<Agent> = (0..4).map(|_| agent(0.7, 500, 2500)).collect();
        let mut policy = ParticipationPolicy::seeded(2024);
        let trials = 10_000;

        let mut counts = [0usize; 4];
        for _ in 0..trials {
            for (i, bot) in bots.iter().enumerate() {
                if policy.decide(bot, "hello").participates {
                    counts[i] += 1;
                }
            }
        }

        for count in counts {
            let rate = count as f64 / trials as f64;
            assert!((rate - 0.7).abs() < 0.03, "rate {}", rate);
        }
    }
}
