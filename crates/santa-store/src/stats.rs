//! Leaderboard statistics computed from finished games.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::params_from_iter;
use santa_models::{GameResult, GameStatus};
use serde::Serialize;

use crate::error::StoreError;
use crate::filter::GameFilter;
use crate::sqlite::Store;

/// Games played and won from one side of the board.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SideRecord {
    pub games: usize,
    pub wins: usize,
}

impl SideRecord {
    /// Win percentage rounded half to even, `None` without games.
    pub fn win_percent(&self) -> Option<u32> {
        if self.games == 0 {
            return None;
        }
        Some((self.wins as f64 / self.games as f64 * 100.0).round_ties_even() as u32)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SideStats {
    pub left: SideRecord,
    pub right: SideRecord,
}

/// Win/draw/lose tally.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct Record {
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
}

impl Record {
    pub fn games(&self) -> usize {
        self.wins + self.draws + self.losses
    }

    /// Fraction of games won, `None` without games.
    pub fn win_ratio(&self) -> Option<f64> {
        match self.games() {
            0 => None,
            n => Some(self.wins as f64 / n as f64),
        }
    }

    fn add(&mut self, other: &Record) {
        self.wins += other.wins;
        self.draws += other.draws;
        self.losses += other.losses;
    }
}

/// Head-to-head record against one opponent.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OpponentStats {
    pub agent_id: i64,
    pub name: Option<String>,
    /// Opponent's current rating, truncated.
    pub rating: Option<i64>,
    pub record: Record,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct OpponentTable {
    /// Sorted by opponent rating, best first.
    pub rows: Vec<OpponentStats>,
    pub total: Record,
}

/// One of an agent's recent games, seen from its side.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecentGame {
    pub game_id: i64,
    pub opponent_name: String,
    /// Opponent's rating when the game started.
    pub opponent_rating: f64,
    pub rating_change: Option<f64>,
    pub started: Option<DateTime<Utc>>,
}

impl Store {
    /// 1-based leaderboard position, `None` for unknown agents.
    pub fn rank(&self, agent_id: i64) -> Result<Option<usize>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id FROM agents ORDER BY rating DESC, id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids.iter().position(|&id| id == agent_id).map(|p| p + 1))
    }

    /// Finished games on either side.
    pub fn num_games(&self, agent_id: i64) -> Result<usize, StoreError> {
        self.count_games(&GameFilter::finished_for(agent_id))
    }

    /// Games and wins per side over finished games.
    pub fn side_stats(&self, agent_id: i64) -> Result<SideStats, StoreError> {
        let side = |agent_column: &str, win: GameResult| -> Result<SideRecord, StoreError> {
            let sql = format!(
                "SELECT COUNT(*), COALESCE(SUM(result = ?1), 0) FROM games \
                 WHERE {agent_column} = ?2 AND status = ?3"
            );
            let (games, wins): (i64, i64) = self.conn.query_row(
                &sql,
                rusqlite::params![win.code(), agent_id, GameStatus::Finished.code()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(SideRecord {
                games: games as usize,
                wins: wins as usize,
            })
        };

        Ok(SideStats {
            left: side("left_agent_id", GameResult::LeftWon)?,
            right: side("right_agent_id", GameResult::RightWon)?,
        })
    }

    /// Head-to-head records against every opponent met in a finished game.
    ///
    /// Self-play and games without a known result are not counted.
    pub fn opponent_stats(&self, agent_id: i64) -> Result<OpponentTable, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT left_agent_id, right_agent_id, result FROM games \
             WHERE (left_agent_id = ?1 OR right_agent_id = ?1) AND status = ?2",
        )?;
        let games = stmt
            .query_map(
                rusqlite::params![agent_id, GameStatus::Finished.code()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records: BTreeMap<i64, Record> = BTreeMap::new();
        for (left_id, right_id, result) in games {
            if left_id == right_id {
                continue;
            }
            let Some(result) = result.and_then(GameResult::from_code) else {
                continue;
            };
            let (opponent, won, lost) = if left_id == agent_id {
                (right_id, GameResult::LeftWon, GameResult::RightWon)
            } else {
                (left_id, GameResult::RightWon, GameResult::LeftWon)
            };
            let record = match result {
                r if r == won => Record { wins: 1, ..Record::default() },
                r if r == lost => Record { losses: 1, ..Record::default() },
                GameResult::Draw => Record { draws: 1, ..Record::default() },
                _ => continue,
            };
            records.entry(opponent).or_default().add(&record);
        }

        if records.is_empty() {
            return Ok(OpponentTable::default());
        }

        let placeholders = vec!["?"; records.len()].join(", ");
        let sql = format!("SELECT id, name, rating FROM agents WHERE id IN ({placeholders})");
        let mut stmt = self.conn.prepare(&sql)?;
        let details: BTreeMap<i64, (String, f64)> = stmt
            .query_map(params_from_iter(records.keys()), |row| {
                Ok((row.get(0)?, (row.get(1)?, row.get(2)?)))
            })?
            .collect::<Result<_, _>>()?;

        let mut total = Record::default();
        let mut rows: Vec<OpponentStats> = records
            .into_iter()
            .map(|(id, record)| {
                total.add(&record);
                let detail = details.get(&id);
                OpponentStats {
                    agent_id: id,
                    name: detail.map(|(name, _)| name.clone()),
                    rating: detail.map(|(_, rating)| *rating as i64),
                    record,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.rating.cmp(&a.rating));

        Ok(OpponentTable { rows, total })
    }

    /// The agent's most recent finished games, newest first.
    pub fn last_games(&self, agent_id: i64, limit: usize) -> Result<Vec<RecentGame>, StoreError> {
        let filter = GameFilter {
            limit: Some(limit),
            ..GameFilter::finished_for(agent_id)
        };
        let games = self.list_games(&filter)?;

        Ok(games
            .into_iter()
            .map(|g| {
                let (opponent_name, opponent_rating, new, old) = if g.left_agent_id == agent_id {
                    (g.right_name, g.right_current_rating, g.left_new_rating, g.left_current_rating)
                } else {
                    (g.left_name, g.left_current_rating, g.right_new_rating, g.right_current_rating)
                };
                RecentGame {
                    game_id: g.id,
                    opponent_name,
                    opponent_rating,
                    rating_change: new.map(|new| new - old),
                    started: g.started,
                }
            })
            .collect())
    }
}
