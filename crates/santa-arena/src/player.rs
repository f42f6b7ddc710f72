use async_trait::async_trait;
use santa_models::{Agent, EnvironmentConfig};
use serde::{Deserialize, Serialize};

use crate::error::ArenaError;

/// What an agent sees before choosing a bandit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub step: usize,
    pub agent_index: usize,
    /// The agent's own cumulative reward.
    pub reward: u16,
    /// Actions of both agents in the previous step, empty on the first step.
    pub last_actions: Vec<usize>,
}

/// Game parameters as sent to agent programs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfiguration {
    pub bandit_count: usize,
    pub decay_rate: f32,
    pub sample_resolution: u32,
    pub episode_steps: usize,
    /// Seconds.
    pub act_timeout: f64,
}

impl From<&EnvironmentConfig> for AgentConfiguration {
    fn from(config: &EnvironmentConfig) -> Self {
        Self {
            bandit_count: config.bandit_count,
            decay_rate: config.decay_rate,
            sample_resolution: config.sample_resolution,
            episode_steps: config.episode_steps,
            act_timeout: config.act_timeout_ms as f64 / 1000.0,
        }
    }
}

/// One line of the agent protocol, sent before every action.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentRequest<'a> {
    pub observation: &'a Observation,
    pub configuration: &'a AgentConfiguration,
}

/// A participant in a game. Mockable for testing.
#[async_trait]
pub trait Player: Send {
    fn name(&self) -> &str;

    /// Choose the bandit to pull this step.
    async fn act(
        &mut self,
        observation: &Observation,
        configuration: &AgentConfiguration,
    ) -> Result<usize, ArenaError>;

    /// Release whatever the player holds (e.g. its process).
    async fn shutdown(&mut self) {}
}

/// Turns registered agents into players.
pub trait PlayerFactory: Send + Sync {
    fn create(&self, agent: &Agent, config: &EnvironmentConfig)
        -> Result<Box<dyn Player>, ArenaError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_uses_competition_field_names() {
        let observation = Observation {
            step: 3,
            agent_index: 1,
            reward: 2,
            last_actions: vec![4, 7],
        };
        let json = serde_json::to_value(&observation).unwrap();
        assert_eq!(json["agentIndex"], 1);
        assert_eq!(json["lastActions"], serde_json::json!([4, 7]));
    }

    #[test]
    fn configuration_timeout_in_seconds() {
        let config = AgentConfiguration::from(&EnvironmentConfig::default());
        assert_eq!(config.act_timeout, 0.25);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["banditCount"], 100);
        assert_eq!(json["sampleResolution"], 100);
    }

    #[test]
    fn request_line_shape() {
        let observation = Observation {
            step: 0,
            agent_index: 0,
            reward: 0,
            last_actions: vec![],
        };
        let configuration = AgentConfiguration::from(&EnvironmentConfig::default());
        let line = serde_json::to_string(&AgentRequest {
            observation: &observation,
            configuration: &configuration,
        })
        .unwrap();
        assert!(line.starts_with(r#"{"observation":{"step":0"#));
        assert!(!line.contains('\n'));
    }
}
