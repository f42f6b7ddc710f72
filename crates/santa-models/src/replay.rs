use serde::{Deserialize, Serialize};

use crate::game::Game;

/// Step-by-step reconstruction of a finished game.
///
/// Holds what a visualization needs: the thresholds in effect at every step,
/// both pulls, and the running per-bandit tallies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Replay {
    pub game_id: i64,
    pub left_name: String,
    pub right_name: String,
    /// Bandit indices ordered by initial threshold, highest first.
    pub bandit_order: Vec<usize>,
    pub frames: Vec<Frame>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    pub step: usize,
    /// Thresholds at the moment of the pull, before this step's decay.
    pub thresholds: Vec<f32>,
    pub left_action: usize,
    pub right_action: usize,
    pub left_reward: u16,
    pub right_reward: u16,
    pub total_left_reward: u16,
    pub total_right_reward: u16,
    pub max_threshold: f32,
    pub median_threshold: f32,
    pub left_action_count: Vec<u32>,
    pub right_action_count: Vec<u32>,
    pub left_reward_count: Vec<u32>,
    pub right_reward_count: Vec<u32>,
}

impl Replay {
    /// Rebuild the replay. `None` unless the full trajectory was recorded.
    pub fn from_game(game: &Game) -> Option<Self> {
        let initial = game.initial_thresholds.as_ref()?;
        let left_actions = game.left_actions.as_ref()?;
        let right_actions = game.right_actions.as_ref()?;
        let left_rewards = game.left_rewards.as_ref()?;
        let right_rewards = game.right_rewards.as_ref()?;
        let decay = game.configuration.clone().unwrap_or_default().decay_rate;

        let num_bandits = initial.len();
        let mut bandit_order: Vec<usize> = (0..num_bandits).collect();
        bandit_order.sort_by(|a, b| initial[*b].cmp(&initial[*a]));

        let mut th: Vec<f32> = initial.iter().map(|&t| t as f32).collect();
        let mut left_action_count = vec![0u32; num_bandits];
        let mut right_action_count = vec![0u32; num_bandits];
        let mut left_reward_count = vec![0u32; num_bandits];
        let mut right_reward_count = vec![0u32; num_bandits];

        let steps = left_actions
            .len()
            .min(right_actions.len())
            .min(left_rewards.len())
            .min(right_rewards.len());
        let mut frames = Vec::with_capacity(steps);
        let (mut prev_left, mut prev_right) = (0u16, 0u16);

        for step in 0..steps {
            let la = left_actions[step] as usize;
            let ra = right_actions[step] as usize;
            if la >= num_bandits || ra >= num_bandits {
                return None;
            }
            let left_reward = left_rewards[step].saturating_sub(prev_left);
            let right_reward = right_rewards[step].saturating_sub(prev_right);
            prev_left = left_rewards[step];
            prev_right = right_rewards[step];

            left_action_count[la] += 1;
            right_action_count[ra] += 1;
            left_reward_count[la] += left_reward as u32;
            right_reward_count[ra] += right_reward as u32;

            frames.push(Frame {
                step,
                thresholds: th.clone(),
                left_action: la,
                right_action: ra,
                left_reward,
                right_reward,
                total_left_reward: left_rewards[step],
                total_right_reward: right_rewards[step],
                max_threshold: th.iter().copied().fold(0.0, f32::max),
                median_threshold: median(&th),
                left_action_count: left_action_count.clone(),
                right_action_count: right_action_count.clone(),
                left_reward_count: left_reward_count.clone(),
                right_reward_count: right_reward_count.clone(),
            });

            th[la] *= decay;
            th[ra] *= decay;
        }

        Some(Self {
            game_id: game.id,
            left_name: game.left_name.clone(),
            right_name: game.right_name.clone(),
            bandit_order,
            frames,
        })
    }

    /// Reorder per-bandit values so the initially best bandit comes first.
    /// `None` when `values` has fewer entries than there are bandits.
    pub fn order_bandits<T: Copy>(&self, values: &[T]) -> Option<Vec<T>> {
        self.bandit_order.iter().map(|&i| values.get(i).copied()).collect()
    }
}

fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
