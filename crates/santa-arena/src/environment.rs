//! The Santa 2020 two-player multi-armed bandit game.
//!
//! Every bandit starts with a hidden integer threshold in
//! `0..=sample_resolution`. Each step both agents pull a bandit at the same
//! time; a pull pays 1 with probability `threshold / sample_resolution`, read
//! before the step's decay. Afterwards every pulled bandit's threshold is
//! multiplied by `decay_rate`, once per pull.

use rand::Rng;
use santa_models::EnvironmentConfig;

use crate::error::ArenaError;
use crate::player::Observation;

pub const NUM_AGENTS: usize = 2;

pub struct MabEnvironment<R: Rng> {
    config: EnvironmentConfig,
    rng: R,
    initial_thresholds: Vec<u8>,
    thresholds: Vec<f32>,
    step: usize,
    rewards: [u16; NUM_AGENTS],
    last_actions: Option<[usize; NUM_AGENTS]>,
}

impl<R: Rng> MabEnvironment<R> {
    /// Validate the configuration and deal the initial thresholds.
    pub fn new(config: EnvironmentConfig, rng: R) -> Result<Self, ArenaError> {
        validate(&config)?;
        let mut env = Self {
            config,
            rng,
            initial_thresholds: vec![],
            thresholds: vec![],
            step: 0,
            rewards: [0; NUM_AGENTS],
            last_actions: None,
        };
        env.reset();
        Ok(env)
    }

    /// Start a new episode with fresh thresholds.
    pub fn reset(&mut self) {
        let resolution = self.config.sample_resolution as u8;
        self.initial_thresholds = (0..self.config.bandit_count)
            .map(|_| self.rng.gen_range(0..=resolution))
            .collect();
        self.thresholds = self.initial_thresholds.iter().map(|&t| t as f32).collect();
        self.step = 0;
        self.rewards = [0; NUM_AGENTS];
        self.last_actions = None;
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn initial_thresholds(&self) -> &[u8] {
        &self.initial_thresholds
    }

    /// Current (decayed) thresholds.
    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    /// Number of steps played so far.
    pub fn step_count(&self) -> usize {
        self.step
    }

    pub fn rewards(&self) -> [u16; NUM_AGENTS] {
        self.rewards
    }

    pub fn is_done(&self) -> bool {
        self.step >= self.config.action_steps()
    }

    pub fn observation(&self, agent_index: usize) -> Observation {
        Observation {
            step: self.step,
            agent_index,
            reward: self.rewards.get(agent_index).copied().unwrap_or(0),
            last_actions: self
                .last_actions
                .map(|actions| actions.to_vec())
                .unwrap_or_default(),
        }
    }

    /// Play one step and return both cumulative rewards.
    pub fn step(&mut self, actions: [usize; NUM_AGENTS]) -> Result<[u16; NUM_AGENTS], ArenaError> {
        for (player_index, &action) in actions.iter().enumerate() {
            if action >= self.config.bandit_count {
                return Err(ArenaError::InvalidAction {
                    player_index,
                    action,
                });
            }
        }

        let resolution = self.config.sample_resolution as f32;
        for (player_index, &action) in actions.iter().enumerate() {
            if self.rng.gen_range(0.0..resolution) < self.thresholds[action] {
                self.rewards[player_index] += 1;
            }
        }
        for &action in &actions {
            self.thresholds[action] *= self.config.decay_rate;
        }

        self.last_actions = Some(actions);
        self.step += 1;
        Ok(self.rewards)
    }
}

pub(crate) fn validate(config: &EnvironmentConfig) -> Result<(), ArenaError> {
    if config.bandit_count == 0 || config.bandit_count > u8::MAX as usize + 1 {
        return Err(ArenaError::Config(format!(
            "bandit_count must be in 1..=256, got {}",
            config.bandit_count
        )));
    }
    if config.sample_resolution == 0 || config.sample_resolution > u8::MAX as u32 {
        return Err(ArenaError::Config(format!(
            "sample_resolution must be in 1..=255, got {}",
            config.sample_resolution
        )));
    }
    if config.episode_steps < 2 || config.episode_steps > u16::MAX as usize {
        return Err(ArenaError::Config(format!(
            "episode_steps must be in 2..=65535, got {}",
            config.episode_steps
        )));
    }
    if !(0.0..=1.0).contains(&config.decay_rate) {
        return Err(ArenaError::Config(format!(
            "decay_rate must be in 0..=1, got {}",
            config.decay_rate
        )));
    }
    Ok(())
}
