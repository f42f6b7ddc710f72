//! In-process players and a factory for exercising the arena without
//! launching agent programs.

use std::collections::HashMap;

use async_trait::async_trait;
use santa_models::{Agent, EnvironmentConfig};

use crate::error::ArenaError;
use crate::player::{AgentConfiguration, Observation, Player, PlayerFactory};

/// Which in-process behavior a test agent gets.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Always pull the same bandit.
    Fixed(usize),
    /// Pull bandits in order, wrapping around.
    RoundRobin,
    /// Pull the bandit with the highest observed payout rate, exploring
    /// untried bandits first.
    Greedy,
    /// Answer with an out-of-range bandit.
    Invalid,
    /// Fail on the given step.
    FailAt(usize),
    /// Never answer.
    Stall,
}

pub struct StrategyPlayer {
    name: String,
    strategy: Strategy,
    pulls: Vec<u32>,
    wins: Vec<u32>,
    last_action: Option<usize>,
    last_reward: u16,
}

impl StrategyPlayer {
    pub fn new(name: &str, strategy: Strategy) -> Self {
        Self {
            name: name.to_string(),
            strategy,
            pulls: vec![],
            wins: vec![],
            last_action: None,
            last_reward: 0,
        }
    }

    fn greedy(&mut self, observation: &Observation, bandits: usize) -> usize {
        if self.pulls.len() != bandits {
            self.pulls = vec![0; bandits];
            self.wins = vec![0; bandits];
        }
        if let Some(last) = self.last_action {
            self.pulls[last] += 1;
            if observation.reward > self.last_reward {
                self.wins[last] += 1;
            }
        }
        self.last_reward = observation.reward;

        if let Some(untried) = self.pulls.iter().position(|&p| p == 0) {
            return untried;
        }
        (0..bandits)
            .max_by(|&a, &b| {
                let rate_a = self.wins[a] as f64 / self.pulls[a] as f64;
                let rate_b = self.wins[b] as f64 / self.pulls[b] as f64;
                rate_a.total_cmp(&rate_b)
            })
            .unwrap_or(0)
    }
}

#[async_trait]
impl Player for StrategyPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn act(
        &mut self,
        observation: &Observation,
        configuration: &AgentConfiguration,
    ) -> Result<usize, ArenaError> {
        let bandits = configuration.bandit_count;
        let action = match self.strategy {
            Strategy::Fixed(bandit) => bandit,
            Strategy::RoundRobin => observation.step % bandits,
            Strategy::Greedy => self.greedy(observation, bandits),
            Strategy::Invalid => bandits,
            Strategy::FailAt(step) if step == observation.step => {
                return Err(ArenaError::Player {
                    player: self.name.clone(),
                    message: format!("scripted failure at step {step}"),
                });
            }
            Strategy::FailAt(_) => 0,
            Strategy::Stall => std::future::pending::<usize>().await,
        };
        self.last_action = Some(action);
        Ok(action)
    }
}

/// Builds [`StrategyPlayer`]s keyed by agent name.
#[derive(Debug, Clone, Default)]
pub struct StrategyFactory {
    strategies: HashMap<String, Strategy>,
}

impl StrategyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, agent_name: &str, strategy: Strategy) -> Self {
        self.strategies.insert(agent_name.to_string(), strategy);
        self
    }
}

impl PlayerFactory for StrategyFactory {
    fn create(
        &self,
        agent: &Agent,
        _config: &EnvironmentConfig,
    ) -> Result<Box<dyn Player>, ArenaError> {
        let strategy = self
            .strategies
            .get(&agent.name)
            .cloned()
            .ok_or(ArenaError::MissingFile(agent.id))?;
        Ok(Box::new(StrategyPlayer::new(&agent.name, strategy)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(step: usize, reward: u16) -> Observation {
        Observation {
            step,
            agent_index: 0,
            reward,
            last_actions: vec![],
        }
    }

    fn configuration(bandits: usize) -> AgentConfiguration {
        AgentConfiguration::from(&EnvironmentConfig {
            bandit_count: bandits,
            ..EnvironmentConfig::default()
        })
    }

    #[tokio::test]
    async fn round_robin_wraps() {
        let mut player = StrategyPlayer::new("rr", Strategy::RoundRobin);
        let config = configuration(3);
        let mut actions = vec![];
        for step in 0..5 {
            actions.push(player.act(&observation(step, 0), &config).await.unwrap());
        }
        assert_eq!(actions, vec![0, 1, 2, 0, 1]);
    }

    #[tokio::test]
    async fn greedy_explores_then_exploits() {
        let mut player = StrategyPlayer::new("greedy", Strategy::Greedy);
        let config = configuration(3);
        // Explore 0, 1, 2; only bandit 1 pays.
        assert_eq!(player.act(&observation(0, 0), &config).await.unwrap(), 0);
        assert_eq!(player.act(&observation(1, 0), &config).await.unwrap(), 1);
        assert_eq!(player.act(&observation(2, 1), &config).await.unwrap(), 2);
        assert_eq!(player.act(&observation(3, 1), &config).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn scripted_failure() {
        let mut player = StrategyPlayer::new("flaky", Strategy::FailAt(1));
        let config = configuration(3);
        assert!(player.act(&observation(0, 0), &config).await.is_ok());
        assert!(player.act(&observation(1, 0), &config).await.is_err());
    }

    #[test]
    fn factory_rejects_unknown_agents() {
        let factory = StrategyFactory::new().with("known", Strategy::Fixed(0));
        let agent = Agent {
            id: 9,
            name: "unknown".to_string(),
            source: None,
            rating: 600.0,
            file: None,
            enabled: true,
            created_at: None,
        };
        assert!(factory.create(&agent, &EnvironmentConfig::default()).is_err());
    }
}
