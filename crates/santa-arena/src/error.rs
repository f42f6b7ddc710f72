use santa_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArenaError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Agents must be different")]
    SameAgent,

    #[error("Can't find agent with id {0}.")]
    AgentNotFound(i64),

    #[error("Agent {0} has no program file")]
    MissingFile(i64),

    #[error("Player '{player}' failed: {message}")]
    Player { player: String, message: String },

    #[error("Player '{player}' timed out after {millis} ms")]
    Timeout { player: String, millis: u64 },

    #[error("Player {player_index} chose invalid bandit {action}")]
    InvalidAction { player_index: usize, action: usize },

    #[error("Unknown result '{0}'.")]
    UnknownResult(String),

    #[error("Game cancelled")]
    Cancelled,

    #[error("Invalid environment configuration: {0}")]
    Config(String),
}
