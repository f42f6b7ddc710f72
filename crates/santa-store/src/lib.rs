pub mod error;
pub mod filter;
mod rows;
pub mod sqlite;
pub mod stats;

pub use error::StoreError;
pub use filter::{AgentFilter, GameFilter};
pub use sqlite::Store;
pub use stats::{OpponentStats, OpponentTable, RecentGame, Record, SideRecord, SideStats};
