pub mod elo;
pub mod environment;
pub mod error;
pub mod player;
pub mod process;
pub mod runner;

pub mod test_support;

pub use environment::MabEnvironment;
pub use error::ArenaError;
pub use player::{AgentConfiguration, Observation, Player, PlayerFactory};
pub use process::{ProcessPlayer, ProcessPlayerFactory};
pub use runner::{choose_agents, Arena, GameSettings};
