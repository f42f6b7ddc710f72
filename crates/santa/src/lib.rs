//! Santa 2020 leaderboard administration.
//!
//! Agents and games live in a SQLite database shared with the `run_games`
//! runner. This crate renders them for the `santa` command line.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use santa::models::SantaConfig;
//! use santa::report::AgentDetail;
//!
//! let config = SantaConfig::default();
//! let store = santa::open_store(&config).unwrap();
//! println!("{}", AgentDetail::load(&store, 1, config.reports.last_games).unwrap());
//! ```

pub use santa_models as models;
pub use santa_store as store;

pub mod report;
pub mod table;

use std::path::Path;

use santa_models::SantaConfig;
use santa_store::{Store, StoreError};

/// Open the configured database, creating its directory when needed.
pub fn open_store(config: &SantaConfig) -> Result<Store, anyhow::Error> {
    let path = &config.database.sqlite_path;
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Store::open(path)?)
}

/// Map a missing row to the admin's "Can't find" message.
pub fn not_found(kind: &str, id: i64) -> impl FnOnce(StoreError) -> anyhow::Error + '_ {
    move |e| match e {
        StoreError::NotFound(_) => anyhow::anyhow!("Can't find {kind} with id {id}."),
        other => other.into(),
    }
}
