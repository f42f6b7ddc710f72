//! SQLite schema of the leaderboard database.
//!
//! Arrays and the environment configuration are stored as JSON text,
//! timestamps as RFC 3339 text and enums as their integer codes.

/// Initial schema.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS agents (
///     id          INTEGER PRIMARY KEY AUTOINCREMENT,
///     name        TEXT NOT NULL DEFAULT '',
///     source      TEXT,
///     rating      REAL NOT NULL DEFAULT 600,
///     file        TEXT,
///     created_at  TEXT
/// );
///
/// CREATE TABLE IF NOT EXISTS games (
///     id                    INTEGER PRIMARY KEY AUTOINCREMENT,
///     started               TEXT,
///     finished              TEXT,
///     status                INTEGER NOT NULL DEFAULT 0,
///     configuration         TEXT,
///     left_agent_id         INTEGER NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
///     right_agent_id        INTEGER NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
///     left_current_rating   REAL NOT NULL,
///     right_current_rating  REAL NOT NULL,
///     left_new_rating       REAL,
///     right_new_rating      REAL,
///     initial_thresholds    TEXT,
///     left_actions          TEXT,
///     right_actions         TEXT,
///     left_rewards          TEXT,
///     right_rewards         TEXT,
///     result                INTEGER DEFAULT 20
/// );
/// ```
pub const CREATE_TABLES_DDL: &str = "\
CREATE TABLE IF NOT EXISTS agents (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL DEFAULT '',
    source      TEXT,
    rating      REAL NOT NULL DEFAULT 600,
    file        TEXT,
    created_at  TEXT
);
CREATE TABLE IF NOT EXISTS games (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    started               TEXT,
    finished              TEXT,
    status                INTEGER NOT NULL DEFAULT 0,
    configuration         TEXT,
    left_agent_id         INTEGER NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
    right_agent_id        INTEGER NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
    left_current_rating   REAL NOT NULL,
    right_current_rating  REAL NOT NULL,
    left_new_rating       REAL,
    right_new_rating      REAL,
    initial_thresholds    TEXT,
    left_actions          TEXT,
    right_actions         TEXT,
    left_rewards          TEXT,
    right_rewards         TEXT,
    result                INTEGER DEFAULT 20
);
CREATE INDEX IF NOT EXISTS idx_games_left_agent ON games(left_agent_id);
CREATE INDEX IF NOT EXISTS idx_games_right_agent ON games(right_agent_id);
CREATE INDEX IF NOT EXISTS idx_games_status ON games(status);
CREATE INDEX IF NOT EXISTS idx_games_started ON games(started);
";

/// Adds the `enabled` switch used to take agents out of rotation.
pub const ADD_AGENT_ENABLED_DDL: &str = "\
ALTER TABLE agents ADD COLUMN enabled INTEGER NOT NULL DEFAULT 1;
CREATE INDEX IF NOT EXISTS idx_agents_rating ON agents(rating);
CREATE INDEX IF NOT EXISTS idx_games_result ON games(result);
";

/// Ordered migrations. Migration `i` brings `PRAGMA user_version` to `i + 1`.
pub const MIGRATIONS: &[&str] = &[CREATE_TABLES_DDL, ADD_AGENT_ENABLED_DDL];

/// Schema version of a fully migrated database.
pub fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Migrations still to apply for a database at `current` version.
pub fn pending(current: u32) -> impl Iterator<Item = (u32, &'static str)> {
    MIGRATIONS
        .iter()
        .enumerate()
        .skip(current as usize)
        .map(|(i, ddl)| (i as u32 + 1, *ddl))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_applies_everything() {
        let versions: Vec<u32> = pending(0).map(|(v, _)| v).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn up_to_date_database_has_nothing_pending() {
        assert_eq!(pending(latest_version()).count(), 0);
    }

    #[test]
    fn partially_migrated_database() {
        let remaining: Vec<(u32, &str)> = pending(1).collect();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].1.contains("enabled"));
    }
}
