use santa_arena::ArenaError;
use santa_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Arena(#[from] ArenaError),

    #[error("There must be at least 2 agents.")]
    NotEnoughAgents,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
