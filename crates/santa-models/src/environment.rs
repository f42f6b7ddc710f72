use serde::{Deserialize, Serialize};

/// Configuration of the Santa 2020 multi-armed bandit game.
///
/// Stored alongside every game so derived metrics can be recomputed with the
/// exact parameters the game was played with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Number of bandits (arms) available each step.
    pub bandit_count: usize,
    /// Multiplier applied to a bandit's threshold each time it is pulled.
    pub decay_rate: f32,
    /// Upper bound of thresholds; a pull pays out with probability
    /// `threshold / sample_resolution`.
    pub sample_resolution: u32,
    /// Episode length, including the initial observation step.
    pub episode_steps: usize,
    /// Per-action timeout for agent programs.
    pub act_timeout_ms: u64,
    /// Fixed seed for reproducible games.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            bandit_count: 100,
            decay_rate: 0.97,
            sample_resolution: 100,
            episode_steps: 2000,
            act_timeout_ms: 250,
            seed: None,
        }
    }
}

impl EnvironmentConfig {
    /// Number of steps in which both agents submit an action.
    pub fn action_steps(&self) -> usize {
        self.episode_steps.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_competition() {
        let config = EnvironmentConfig::default();
        assert_eq!(config.bandit_count, 100);
        assert_eq!(config.sample_resolution, 100);
        assert_eq!(config.action_steps(), 1999);
        assert!((config.decay_rate - 0.97).abs() < f32::EPSILON);
    }

    #[test]
    fn serializes_without_seed() {
        let json = serde_json::to_value(EnvironmentConfig::default()).unwrap();
        assert_eq!(json["bandit_count"], 100);
        assert_eq!(json["episode_steps"], 2000);
        assert!(json.get("seed").is_none());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: EnvironmentConfig =
            serde_json::from_str(r#"{"bandit_count": 10, "seed": 7}"#).unwrap();
        assert_eq!(config.bandit_count, 10);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.episode_steps, 2000);
    }
}
