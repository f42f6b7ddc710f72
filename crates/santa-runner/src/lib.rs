pub mod config;
pub mod error;
pub mod runner;

pub use config::load_config;
pub use error::RunnerError;
pub use runner::{GameRunner, RunSummary};
