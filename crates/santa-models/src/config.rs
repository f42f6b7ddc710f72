use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agent::DEFAULT_RATING;
use crate::environment::EnvironmentConfig;

/// Top-level configuration shared by `santa` and `run_games`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SantaConfig {
    pub database: DatabaseConfig,
    pub environment: EnvironmentConfig,
    pub rating: RatingConfig,
    pub players: PlayersConfig,
    pub reports: ReportsConfig,
}

/// Where the leaderboard lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub sqlite_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/santa.db".to_string(),
        }
    }
}

/// Elo parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RatingConfig {
    /// Rating given to newly registered agents.
    pub initial: f64,
    /// Maximum rating change per game.
    pub k_factor: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            initial: DEFAULT_RATING,
            k_factor: 32.0,
        }
    }
}

/// How agent programs are launched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayersConfig {
    /// File extension -> interpreter command. Files with other extensions are
    /// executed directly.
    pub interpreters: BTreeMap<String, String>,
}

impl Default for PlayersConfig {
    fn default() -> Self {
        Self {
            interpreters: BTreeMap::from([("py".to_string(), "python3".to_string())]),
        }
    }
}

impl PlayersConfig {
    /// Interpreter for an agent file, looked up by extension.
    pub fn interpreter_for(&self, file: &str) -> Option<&str> {
        let ext = std::path::Path::new(file).extension()?.to_str()?;
        self.interpreters.get(ext).map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportsConfig {
    /// Number of games listed under an agent's recent history.
    pub last_games: usize,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self { last_games: 50 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_santa_config() {
        let config = SantaConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: SantaConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn empty_toml_is_default() {
        let config: SantaConfig = toml::from_str("").unwrap();
        assert_eq!(config, SantaConfig::default());
        assert_eq!(config.rating.k_factor, 32.0);
        assert_eq!(config.reports.last_games, 50);
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[database]
sqlite_path = "/tmp/leaderboard.db"

[environment]
bandit_count = 10
episode_steps = 50
seed = 42

[rating]
k_factor = 16.0

[players.interpreters]
py = "python3.9"
js = "node"
"#;

        let config: SantaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database.sqlite_path, "/tmp/leaderboard.db");
        assert_eq!(config.environment.bandit_count, 10);
        assert_eq!(config.environment.seed, Some(42));
        assert_eq!(config.environment.sample_resolution, 100);
        assert_eq!(config.rating.k_factor, 16.0);
        assert_eq!(config.rating.initial, 600.0);
        assert_eq!(config.players.interpreter_for("agents/a.js"), Some("node"));
        assert_eq!(config.players.interpreter_for("agents/a.py"), Some("python3.9"));
    }

    #[test]
    fn executables_have_no_interpreter() {
        let players = PlayersConfig::default();
        assert_eq!(players.interpreter_for("agents/greedy"), None);
        assert_eq!(players.interpreter_for("agents/greedy.sh"), None);
        assert_eq!(players.interpreter_for("agents/greedy.py"), Some("python3"));
    }
}
