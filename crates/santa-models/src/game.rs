use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::environment::EnvironmentConfig;

/// Lifecycle of a game row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Started,
    Finished,
    Deleted,
}

impl GameStatus {
    pub const ALL: [GameStatus; 3] = [Self::Started, Self::Finished, Self::Deleted];

    /// Integer code stored in the database.
    pub fn code(self) -> i64 {
        match self {
            Self::Started => 0,
            Self::Finished => 10,
            Self::Deleted => 20,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Finished => "FINISHED",
            Self::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown game status '{s}'"))
    }
}

/// Outcome of a game from the left agent's point of view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameResult {
    LeftWon,
    RightWon,
    Draw,
    Unknown,
}

impl GameResult {
    pub const ALL: [GameResult; 4] = [Self::LeftWon, Self::RightWon, Self::Draw, Self::Unknown];

    /// Integer code stored in the database.
    pub fn code(self) -> i64 {
        match self {
            Self::LeftWon => 0,
            Self::RightWon => 1,
            Self::Draw => 10,
            Self::Unknown => 20,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::LeftWon => "LEFT_WON",
            Self::RightWon => "RIGHT_WON",
            Self::Draw => "DRAW",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Result implied by the final cumulative rewards.
    pub fn from_totals(left: u16, right: u16) -> Self {
        match left.cmp(&right) {
            std::cmp::Ordering::Greater => Self::LeftWon,
            std::cmp::Ordering::Less => Self::RightWon,
            std::cmp::Ordering::Equal => Self::Draw,
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GameResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|result| result.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown game result '{s}'"))
    }
}

/// One match between two agents, with its recorded trajectory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Game {
    pub id: i64,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
    pub status: GameStatus,
    pub configuration: Option<EnvironmentConfig>,

    pub left_agent_id: i64,
    pub right_agent_id: i64,
    pub left_name: String,
    pub right_name: String,

    /// Ratings at the moment the game started.
    pub left_current_rating: f64,
    pub right_current_rating: f64,
    pub left_new_rating: Option<f64>,
    pub right_new_rating: Option<f64>,

    pub initial_thresholds: Option<Vec<u8>>,
    pub left_actions: Option<Vec<u8>>,
    pub right_actions: Option<Vec<u8>>,
    /// Cumulative rewards per step; the last element is the total.
    pub left_rewards: Option<Vec<u16>>,
    pub right_rewards: Option<Vec<u16>>,

    pub result: GameResult,
}

impl Game {
    /// Wall time between start and finish, if both are known.
    pub fn execution_time(&self) -> Option<Duration> {
        match (self.started, self.finished) {
            (Some(started), Some(finished)) => Some(finished - started),
            _ => None,
        }
    }

    pub fn total_rewards(&self) -> Option<(u16, u16)> {
        let left = self.left_rewards.as_ref()?.last()?;
        let right = self.right_rewards.as_ref()?.last()?;
        Some((*left, *right))
    }

    fn decay_and_resolution(&self) -> (f32, f32) {
        let config = self.configuration.clone().unwrap_or_default();
        (config.decay_rate, config.sample_resolution as f32)
    }

    /// Expected reward of each pull, replaying the threshold decay.
    ///
    /// Both sides read the thresholds before the step's decay is applied.
    pub fn expected_rewards_estimation(&self) -> Option<(Vec<f32>, Vec<f32>)> {
        let mut th: Vec<f32> = self
            .initial_thresholds
            .as_ref()?
            .iter()
            .map(|&t| t as f32)
            .collect();
        let left_actions = self.left_actions.as_ref()?;
        let right_actions = self.right_actions.as_ref()?;
        let (decay, resolution) = self.decay_and_resolution();

        let mut left_expected = Vec::with_capacity(left_actions.len());
        let mut right_expected = Vec::with_capacity(right_actions.len());
        for (&la, &ra) in left_actions.iter().zip(right_actions) {
            let (la, ra) = (la as usize, ra as usize);
            left_expected.push(th.get(la).copied().unwrap_or(0.0) / resolution);
            right_expected.push(th.get(ra).copied().unwrap_or(0.0) / resolution);
            for action in [la, ra] {
                if let Some(t) = th.get_mut(action) {
                    *t *= decay;
                }
            }
        }
        Some((left_expected, right_expected))
    }

    pub fn total_expected_rewards(&self) -> Option<(f32, f32)> {
        let (left, right) = self.expected_rewards_estimation()?;
        Some((left.iter().sum(), right.iter().sum()))
    }

    /// Thresholds after every recorded pull has decayed its bandit.
    pub fn thresholds_at_the_end(&self) -> Option<Vec<f32>> {
        let mut th: Vec<f32> = self
            .initial_thresholds
            .as_ref()?
            .iter()
            .map(|&t| t as f32)
            .collect();
        let (decay, _) = self.decay_and_resolution();
        let actions = self
            .left_actions
            .iter()
            .flatten()
            .chain(self.right_actions.iter().flatten());
        for &action in actions {
            if let Some(t) = th.get_mut(action as usize) {
                *t *= decay;
            }
        }
        Some(th)
    }

    /// Rating deltas `(left, right)` once the game has been rated.
    pub fn rating_changes(&self) -> Option<(f64, f64)> {
        let left = self.left_new_rating? - self.left_current_rating;
        let right = self.right_new_rating? - self.right_current_rating;
        Some((left, right))
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Game '{}' {:.1} vs '{}' {:.1} - {}",
            self.left_name,
            self.left_current_rating,
            self.right_name,
            self.right_current_rating,
            self.result
        )
    }
}

/// Insert payload for a game that is about to be played.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    pub left_agent_id: i64,
    pub right_agent_id: i64,
    pub left_current_rating: f64,
    pub right_current_rating: f64,
    pub configuration: Option<EnvironmentConfig>,
}

/// Everything recorded once a game has been played to the end.
#[derive(Debug, Clone, PartialEq)]
pub struct GameOutcome {
    pub initial_thresholds: Vec<u8>,
    pub left_actions: Vec<u8>,
    pub right_actions: Vec<u8>,
    pub left_rewards: Vec<u16>,
    pub right_rewards: Vec<u16>,
    pub result: GameResult,
    pub left_new_rating: f64,
    pub right_new_rating: f64,
}
