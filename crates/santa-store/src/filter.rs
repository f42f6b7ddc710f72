use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use santa_models::{GameResult, GameStatus};

use crate::rows::timestamp;

/// Filters for listing agents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentFilter {
    pub enabled: Option<bool>,
}

impl AgentFilter {
    pub(crate) fn where_clause(&self) -> (String, Vec<Value>) {
        match self.enabled {
            Some(enabled) => (
                " WHERE enabled = ?".to_string(),
                vec![Value::Integer(enabled as i64)],
            ),
            None => (String::new(), vec![]),
        }
    }
}

/// Filters for listing games. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameFilter {
    pub left_agent: Option<i64>,
    pub right_agent: Option<i64>,
    /// Agent on either side.
    pub agent: Option<i64>,
    pub status: Option<GameStatus>,
    pub result: Option<GameResult>,
    pub started_after: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl GameFilter {
    pub fn finished_for(agent_id: i64) -> Self {
        Self {
            agent: Some(agent_id),
            status: Some(GameStatus::Finished),
            ..Self::default()
        }
    }

    /// WHERE clause over the `g` alias of the games table, with its parameters.
    pub(crate) fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(id) = self.left_agent {
            clauses.push("g.left_agent_id = ?".to_string());
            params.push(Value::Integer(id));
        }
        if let Some(id) = self.right_agent {
            clauses.push("g.right_agent_id = ?".to_string());
            params.push(Value::Integer(id));
        }
        if let Some(id) = self.agent {
            clauses.push("(g.left_agent_id = ? OR g.right_agent_id = ?)".to_string());
            params.push(Value::Integer(id));
            params.push(Value::Integer(id));
        }
        if let Some(status) = self.status {
            clauses.push("g.status = ?".to_string());
            params.push(Value::Integer(status.code()));
        }
        if let Some(result) = self.result {
            clauses.push("g.result = ?".to_string());
            params.push(Value::Integer(result.code()));
        }
        if let Some(after) = self.started_after {
            clauses.push("g.started >= ?".to_string());
            params.push(Value::Text(timestamp(after)));
        }

        if clauses.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), params)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_clause() {
        let (sql, params) = GameFilter::default().where_clause();
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn finished_for_agent_matches_both_sides() {
        let (sql, params) = GameFilter::finished_for(3).where_clause();
        assert_eq!(
            sql,
            " WHERE (g.left_agent_id = ? OR g.right_agent_id = ?) AND g.status = ?"
        );
        assert_eq!(
            params,
            vec![Value::Integer(3), Value::Integer(3), Value::Integer(10)]
        );
    }

    #[test]
    fn agent_filter_enabled() {
        let (sql, params) = AgentFilter { enabled: Some(false) }.where_clause();
        assert_eq!(sql, " WHERE enabled = ?");
        assert_eq!(params, vec![Value::Integer(0)]);
    }
}
