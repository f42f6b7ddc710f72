use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rating a freshly registered agent starts with.
pub const DEFAULT_RATING: f64 = 600.0;

/// A registered competitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    /// Where the agent's code was taken from (URL).
    pub source: Option<String>,
    /// Current Elo rating.
    pub rating: f64,
    /// Path to the agent program. Agents without a file never get scheduled.
    pub file: Option<String>,
    pub enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Agent {
    /// True when the agent can be picked by the game runner.
    pub fn is_playable(&self) -> bool {
        self.enabled && self.file.as_deref().is_some_and(|f| !f.is_empty())
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent '{}' {:.1}", self.name, self.rating)
    }
}

/// Insert payload for a new agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAgent {
    pub name: String,
    pub source: Option<String>,
    pub file: Option<String>,
    pub enabled: bool,
    /// Falls back to the configured initial rating.
    pub rating: Option<f64>,
}

impl NewAgent {
    pub fn new(name: impl Into<String>, file: Option<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            file,
            enabled: true,
            rating: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(file: Option<&str>, enabled: bool) -> Agent {
        Agent {
            id: 1,
            name: "greedy".to_string(),
            source: None,
            rating: 612.345,
            file: file.map(str::to_string),
            enabled,
            created_at: None,
        }
    }

    #[test]
    fn display_rounds_rating() {
        assert_eq!(agent(None, true).to_string(), "Agent 'greedy' 612.3");
    }

    #[test]
    fn playable_requires_file_and_enabled() {
        assert!(agent(Some("agents/greedy.py"), true).is_playable());
        assert!(!agent(Some("agents/greedy.py"), false).is_playable());
        assert!(!agent(None, true).is_playable());
        assert!(!agent(Some(""), true).is_playable());
    }

    #[test]
    fn new_agent_defaults() {
        let new = NewAgent::new("random", Some("agents/random.py".to_string()));
        assert!(new.enabled);
        assert!(new.rating.is_none());
        assert!(new.source.is_none());
    }
}
