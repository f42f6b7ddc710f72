pub mod agent;
pub mod config;
pub mod environment;
pub mod game;
pub mod replay;
pub mod schema;

pub use agent::{Agent, NewAgent, DEFAULT_RATING};
pub use config::{DatabaseConfig, PlayersConfig, RatingConfig, ReportsConfig, SantaConfig};
pub use environment::EnvironmentConfig;
pub use game::{Game, GameOutcome, GameResult, GameStatus, NewGame};
pub use replay::{Frame, Replay};
