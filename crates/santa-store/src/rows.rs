use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use santa_models::{Agent, Game, GameResult, GameStatus};

pub(crate) const AGENT_COLUMNS: &str = "id, name, source, rating, file, enabled, created_at";

pub(crate) const GAME_SELECT: &str = "\
SELECT g.id, g.started, g.finished, g.status, g.configuration, \
       g.left_agent_id, g.right_agent_id, la.name, ra.name, \
       g.left_current_rating, g.right_current_rating, g.left_new_rating, g.right_new_rating, \
       g.initial_thresholds, g.left_actions, g.right_actions, g.left_rewards, g.right_rewards, \
       g.result \
FROM games g \
JOIN agents la ON la.id = g.left_agent_id \
JOIN agents ra ON ra.id = g.right_agent_id";

/// Fixed-width UTC timestamps so text ordering matches time ordering.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, format!("bad timestamp '{s}': {e}")))
    })
    .transpose()
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        serde_json::from_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub(crate) fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        source: row.get(2)?,
        rating: row.get(3)?,
        file: row.get(4)?,
        enabled: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
    })
}

pub(crate) fn game_from_row(row: &Row<'_>) -> rusqlite::Result<Game> {
    let status_code: i64 = row.get(3)?;
    let status = GameStatus::from_code(status_code)
        .ok_or_else(|| conversion_error(3, format!("unknown status code {status_code}")))?;
    // NULL results are treated as not yet known.
    let result_code: Option<i64> = row.get(18)?;
    let result = match result_code {
        Some(code) => GameResult::from_code(code)
            .ok_or_else(|| conversion_error(18, format!("unknown result code {code}")))?,
        None => GameResult::Unknown,
    };

    Ok(Game {
        id: row.get(0)?,
        started: timestamp_column(row, 1)?,
        finished: timestamp_column(row, 2)?,
        status,
        configuration: json_column(row, 4)?,
        left_agent_id: row.get(5)?,
        right_agent_id: row.get(6)?,
        left_name: row.get(7)?,
        right_name: row.get(8)?,
        left_current_rating: row.get(9)?,
        right_current_rating: row.get(10)?,
        left_new_rating: row.get(11)?,
        right_new_rating: row.get(12)?,
        initial_thresholds: json_column(row, 13)?,
        left_actions: json_column(row, 14)?,
        right_actions: json_column(row, 15)?,
        left_rewards: json_column(row, 16)?,
        right_rewards: json_column(row, 17)?,
        result,
    })
}
