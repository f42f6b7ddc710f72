use chrono::Utc;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use santa_models::schema;
use santa_models::{
    Agent, Game, GameOutcome, GameResult, GameStatus, NewAgent, NewGame, DEFAULT_RATING,
};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::filter::{AgentFilter, GameFilter};
use crate::rows::{agent_from_row, game_from_row, timestamp, AGENT_COLUMNS, GAME_SELECT};

/// Read-write access to the leaderboard database.
///
/// File-backed databases use WAL so `santa` can read while `run_games` writes.
/// Foreign keys are enforced on every connection: deleting an agent removes
/// its games.
pub struct Store {
    pub(crate) conn: Connection,
}

impl Store {
    /// Open (or create) the database at `path` and apply pending migrations.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let mut conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrate(&mut conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database with the full schema. Useful for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrate(&mut conn)?;
        Ok(Self { conn })
    }

    /// Current `PRAGMA user_version`.
    pub fn schema_version(&self) -> Result<u32, StoreError> {
        Ok(user_version(&self.conn)?)
    }

    // Agents

    pub fn insert_agent(&self, agent: &NewAgent) -> Result<Agent, StoreError> {
        self.conn.execute(
            "INSERT INTO agents (name, source, rating, file, enabled, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                agent.name,
                agent.source,
                agent.rating.unwrap_or(DEFAULT_RATING),
                agent.file,
                agent.enabled,
                timestamp(Utc::now()),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(agent_id = id, name = %agent.name, "Inserted agent");
        self.require_agent(id)
    }

    pub fn get_agent(&self, id: i64) -> Result<Option<Agent>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"))?;
        Ok(stmt.query_row([id], agent_from_row).optional()?)
    }

    /// Like [`Store::get_agent`], failing with `NotFound` for unknown ids.
    pub fn require_agent(&self, id: i64) -> Result<Agent, StoreError> {
        self.get_agent(id)?
            .ok_or_else(|| StoreError::NotFound(format!("agent {id}")))
    }

    /// Agents ordered by rating, best first.
    pub fn list_agents(&self, filter: &AgentFilter) -> Result<Vec<Agent>, StoreError> {
        let (where_sql, params) = filter.where_clause();
        let sql = format!(
            "SELECT {AGENT_COLUMNS} FROM agents{where_sql} ORDER BY rating DESC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let agents = stmt
            .query_map(params_from_iter(params), agent_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(agents)
    }

    /// Ids of enabled agents that have a program to run.
    pub fn playable_agent_ids(&self) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id FROM agents \
             WHERE enabled = 1 AND file IS NOT NULL AND file != '' ORDER BY id",
        )?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Overwrite an agent's editable fields.
    pub fn update_agent(&self, agent: &Agent) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE agents SET name = ?1, source = ?2, rating = ?3, file = ?4, enabled = ?5 \
             WHERE id = ?6",
            rusqlite::params![
                agent.name,
                agent.source,
                agent.rating,
                agent.file,
                agent.enabled,
                agent.id,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("agent {}", agent.id)));
        }
        Ok(())
    }

    pub fn set_rating(&self, agent_id: i64, rating: f64) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE agents SET rating = ?1 WHERE id = ?2",
            rusqlite::params![rating, agent_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("agent {agent_id}")));
        }
        Ok(())
    }

    /// Delete an agent and, through the foreign keys, all of its games.
    pub fn delete_agent(&self, id: i64) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM agents WHERE id = ?1", [id])?;
        if deleted > 0 {
            info!(agent_id = id, "Deleted agent");
        }
        Ok(deleted > 0)
    }

    // Games

    /// Insert a game in the STARTED state.
    pub fn create_game(&self, game: &NewGame) -> Result<Game, StoreError> {
        let configuration = game
            .configuration
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT INTO games \
             (started, status, configuration, left_agent_id, right_agent_id, \
              left_current_rating, right_current_rating, result) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                timestamp(Utc::now()),
                GameStatus::Started.code(),
                configuration,
                game.left_agent_id,
                game.right_agent_id,
                game.left_current_rating,
                game.right_current_rating,
                GameResult::Unknown.code(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(game_id = id, "Created game");
        self.require_game(id)
    }

    /// Persist a finished game together with both agents' new ratings, in one
    /// transaction.
    pub fn record_result(&mut self, game_id: i64, outcome: &GameOutcome) -> Result<Game, StoreError> {
        let tx = self.conn.transaction()?;
        let agents: Option<(i64, i64)> = tx
            .query_row(
                "SELECT left_agent_id, right_agent_id FROM games WHERE id = ?1",
                [game_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (left_id, right_id) =
            agents.ok_or_else(|| StoreError::NotFound(format!("game {game_id}")))?;

        tx.execute(
            "UPDATE games SET \
             finished = ?1, status = ?2, result = ?3, \
             left_new_rating = ?4, right_new_rating = ?5, \
             initial_thresholds = ?6, left_actions = ?7, right_actions = ?8, \
             left_rewards = ?9, right_rewards = ?10 \
             WHERE id = ?11",
            rusqlite::params![
                timestamp(Utc::now()),
                GameStatus::Finished.code(),
                outcome.result.code(),
                outcome.left_new_rating,
                outcome.right_new_rating,
                serde_json::to_string(&outcome.initial_thresholds)?,
                serde_json::to_string(&outcome.left_actions)?,
                serde_json::to_string(&outcome.right_actions)?,
                serde_json::to_string(&outcome.left_rewards)?,
                serde_json::to_string(&outcome.right_rewards)?,
                game_id,
            ],
        )?;
        tx.execute(
            "UPDATE agents SET rating = ?1 WHERE id = ?2",
            rusqlite::params![outcome.left_new_rating, left_id],
        )?;
        tx.execute(
            "UPDATE agents SET rating = ?1 WHERE id = ?2",
            rusqlite::params![outcome.right_new_rating, right_id],
        )?;
        tx.commit()?;

        self.require_game(game_id)
    }

    /// Flag a game that could not be played to the end.
    pub fn mark_deleted(&self, game_id: i64) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE games SET status = ?1, finished = ?2 WHERE id = ?3",
            rusqlite::params![GameStatus::Deleted.code(), timestamp(Utc::now()), game_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("game {game_id}")));
        }
        Ok(())
    }

    pub fn get_game(&self, id: i64) -> Result<Option<Game>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{GAME_SELECT} WHERE g.id = ?1"))?;
        Ok(stmt.query_row([id], game_from_row).optional()?)
    }

    pub fn require_game(&self, id: i64) -> Result<Game, StoreError> {
        self.get_game(id)?
            .ok_or_else(|| StoreError::NotFound(format!("game {id}")))
    }

    /// Games matching `filter`, most recently started first.
    pub fn list_games(&self, filter: &GameFilter) -> Result<Vec<Game>, StoreError> {
        let (where_sql, mut params) = filter.where_clause();
        let mut sql = format!("{GAME_SELECT}{where_sql} ORDER BY g.started DESC, g.id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params.push(rusqlite::types::Value::Integer(limit as i64));
        }
        let mut stmt = self.conn.prepare(&sql)?;
        let games = stmt
            .query_map(params_from_iter(params), game_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(games)
    }

    pub fn count_games(&self, filter: &GameFilter) -> Result<usize, StoreError> {
        let (where_sql, params) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM games g{where_sql}");
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(params), |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn delete_game(&self, id: i64) -> Result<bool, StoreError> {
        let deleted = self.conn.execute("DELETE FROM games WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }
}

fn user_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Apply every migration newer than the database's `user_version`.
fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    let current = user_version(conn)?;
    for (version, ddl) in schema::pending(current) {
        let tx = conn.transaction()?;
        tx.execute_batch(ddl)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        info!(version, "Applied schema migration");
    }
    Ok(())
}
