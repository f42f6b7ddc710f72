//! Text renderings of agents and games for the admin CLI.

use std::fmt;

use chrono::{DateTime, Utc};
use santa_models::{Agent, Game};
use santa_store::{OpponentTable, RecentGame, SideRecord, SideStats, Store, StoreError};

use crate::table::Table;

pub const HISTOGRAM_BINS: usize = 20;
pub const THRESHOLD_MAX: f32 = 100.0;
/// Rows shown in the rewards-over-time table.
pub const REWARD_SAMPLES: usize = 10;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn date(at: Option<DateTime<Utc>>, format: &str) -> String {
    at.map(|t| t.format(format).to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// `+16.0` for a gain, `-16.0` otherwise.
pub fn signed_change(diff: f64) -> String {
    if diff > 0.0 {
        format!("+{diff:.1}")
    } else {
        format!("-{:.1}", diff.abs())
    }
}

fn side_ratio(side: &str, record: &SideRecord) -> String {
    let ratio = record
        .win_percent()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Nan".to_string());
    format!("{side}: {ratio}% ({} games)", record.games)
}

/// `left: 55% (20 games) - right: Nan% (0 games)`
pub fn win_ratio_line(stats: &SideStats) -> String {
    format!(
        "{} - {}",
        side_ratio("left", &stats.left),
        side_ratio("right", &stats.right)
    )
}

pub fn agent_list(agents: &[Agent]) -> String {
    let mut table = Table::new(&["id", "name", "rating", "created_at", "enabled"]);
    for agent in agents {
        table.push(vec![
            agent.id.to_string(),
            agent.name.clone(),
            format!("{:.1}", agent.rating),
            date(agent.created_at, TIMESTAMP_FORMAT),
            agent.enabled.to_string(),
        ]);
    }
    table.to_string()
}

fn percent(ratio: Option<f64>) -> String {
    ratio
        .map(|r| format!("{:.2}%", r * 100.0))
        .unwrap_or_else(|| "-".to_string())
}

/// Per-opponent records with a Total row; `None` when the agent has not
/// met anyone yet.
pub fn statistics_table(stats: &OpponentTable) -> Option<String> {
    if stats.rows.is_empty() {
        return None;
    }
    let mut table = Table::new(&[
        "id",
        "name",
        "rating",
        "num_win",
        "num_draw",
        "num_lose",
        "num_games",
        "win_ratio",
    ]);
    for row in &stats.rows {
        table.push(vec![
            row.agent_id.to_string(),
            or_dash(row.name.as_ref()),
            or_dash(row.rating),
            row.record.wins.to_string(),
            row.record.draws.to_string(),
            row.record.losses.to_string(),
            row.record.games().to_string(),
            percent(row.record.win_ratio()),
        ]);
    }
    let total = &stats.total;
    table.push(vec![
        "-".to_string(),
        "Total".to_string(),
        "-".to_string(),
        total.wins.to_string(),
        total.draws.to_string(),
        total.losses.to_string(),
        total.games().to_string(),
        percent(total.win_ratio()),
    ]);
    Some(table.to_string())
}

pub fn last_games_table(games: &[RecentGame]) -> Option<String> {
    if games.is_empty() {
        return None;
    }
    let mut table = Table::new(&["result", "name", "rating", "date", "game"]);
    for game in games {
        table.push(vec![
            game.rating_change
                .map(signed_change)
                .unwrap_or_else(|| "-".to_string()),
            game.opponent_name.clone(),
            (game.opponent_rating as i64).to_string(),
            date(game.started, DATE_FORMAT),
            game.game_id.to_string(),
        ]);
    }
    Some(table.to_string())
}

/// Everything `agent show` prints about one agent.
#[derive(Debug, Clone)]
pub struct AgentDetail {
    pub agent: Agent,
    pub num_games: usize,
    pub rank: Option<usize>,
    pub sides: SideStats,
    pub opponents: OpponentTable,
    pub last_games: Vec<RecentGame>,
}

impl AgentDetail {
    pub fn load(store: &Store, agent_id: i64, last_games: usize) -> Result<Self, StoreError> {
        let agent = store.require_agent(agent_id)?;
        Ok(Self {
            num_games: store.num_games(agent_id)?,
            rank: store.rank(agent_id)?,
            sides: store.side_stats(agent_id)?,
            opponents: store.opponent_stats(agent_id)?,
            last_games: store.last_games(agent_id, last_games)?,
            agent,
        })
    }
}

impl fmt::Display for AgentDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let agent = &self.agent;
        writeln!(f, "id: {}", agent.id)?;
        writeln!(f, "name: {}", agent.name)?;
        writeln!(f, "enabled: {}", agent.enabled)?;
        writeln!(f, "source: {}", or_dash(agent.source.as_ref()))?;
        writeln!(f, "file: {}", or_dash(agent.file.as_ref()))?;
        writeln!(f, "created_at: {}", date(agent.created_at, TIMESTAMP_FORMAT))?;
        writeln!(f, "num_games: {}", self.num_games)?;
        writeln!(f, "elo_rating: {:.1}", agent.rating)?;
        writeln!(f, "rank: {}", or_dash(self.rank))?;
        writeln!(f, "win_ratio: {}", win_ratio_line(&self.sides))?;

        writeln!(f, "\nstatistics:")?;
        match statistics_table(&self.opponents) {
            Some(table) => write!(f, "{table}")?,
            None => writeln!(f, "-")?,
        }
        writeln!(f, "\nlast games:")?;
        match last_games_table(&self.last_games) {
            Some(table) => write!(f, "{table}"),
            None => writeln!(f, "-"),
        }
    }
}

pub fn game_list(games: &[Game]) -> String {
    let mut table = Table::new(&["id", "left", "right", "started", "status", "result"]);
    for game in games {
        table.push(vec![
            game.id.to_string(),
            game.left_name.clone(),
            game.right_name.clone(),
            date(game.started, TIMESTAMP_FORMAT),
            game.status.to_string(),
            game.result.to_string(),
        ]);
    }
    table.to_string()
}

/// `'greedy' 600.0 (+16.0) - 'random' 612.3 (-16.0)`, once the game is rated.
pub fn rating_line(game: &Game) -> Option<String> {
    let (left_diff, right_diff) = game.rating_changes()?;
    Some(format!(
        "'{}' {:.1} ({}) - '{}' {:.1} ({})",
        game.left_name,
        game.left_current_rating,
        signed_change(left_diff),
        game.right_name,
        game.right_current_rating,
        signed_change(right_diff),
    ))
}

/// Counts of `values` in `bins` equal-width bins over `lo..=hi`. The upper
/// edge belongs to the last bin; values outside the range are ignored.
pub fn histogram(values: &[f32], bins: usize, lo: f32, hi: f32) -> Vec<usize> {
    let mut counts = vec![0; bins];
    if bins == 0 || hi <= lo {
        return counts;
    }
    let width = (hi - lo) / bins as f32;
    for &value in values {
        if !(lo..=hi).contains(&value) {
            continue;
        }
        let bin = (((value - lo) / width) as usize).min(bins - 1);
        counts[bin] += 1;
    }
    counts
}

/// Up to `samples` evenly spaced indices into a series of `len` items,
/// always including the first and the last.
pub fn sample_steps(len: usize, samples: usize) -> Vec<usize> {
    if len <= samples || samples < 2 {
        return (0..len).collect();
    }
    let mut steps: Vec<usize> = (0..samples).map(|i| i * (len - 1) / (samples - 1)).collect();
    steps.dedup();
    steps
}

/// Reward difference per step, oriented so the winner's gap ends positive.
pub fn reward_gap(left: &[u16], right: &[u16]) -> Vec<i32> {
    let mut gap: Vec<i32> = left
        .iter()
        .zip(right)
        .map(|(&l, &r)| l as i32 - r as i32)
        .collect();
    if gap.last().is_some_and(|&g| g < 0) {
        gap.iter_mut().for_each(|g| *g = -*g);
    }
    gap
}

fn threshold_distribution(game: &Game) -> Option<String> {
    let initial: Vec<f32> = game
        .initial_thresholds
        .as_ref()?
        .iter()
        .map(|&t| t as f32)
        .collect();
    let end = game.thresholds_at_the_end()?;
    let before = histogram(&initial, HISTOGRAM_BINS, 0.0, THRESHOLD_MAX);
    let after = histogram(&end, HISTOGRAM_BINS, 0.0, THRESHOLD_MAX);

    let width = THRESHOLD_MAX / HISTOGRAM_BINS as f32;
    let mut table = Table::new(&["threshold", "at the beginning", "at the end"]);
    for (bin, (b, a)) in before.iter().zip(&after).enumerate() {
        table.push(vec![
            format!("{:.0}-{:.0}", bin as f32 * width, (bin + 1) as f32 * width),
            b.to_string(),
            a.to_string(),
        ]);
    }
    Some(table.to_string())
}

fn rewards_over_time(game: &Game) -> Option<String> {
    let left = game.left_rewards.as_ref()?;
    let right = game.right_rewards.as_ref()?;
    let gap = reward_gap(left, right);

    let mut table = Table::new(&["step", game.left_name.as_str(), game.right_name.as_str(), "gap"]);
    for i in sample_steps(gap.len(), REWARD_SAMPLES) {
        table.push(vec![
            (i + 1).to_string(),
            left[i].to_string(),
            right[i].to_string(),
            gap[i].to_string(),
        ]);
    }
    Some(table.to_string())
}

/// Everything `game show` prints about one game.
pub struct GameDetail<'a> {
    game: &'a Game,
}

impl<'a> GameDetail<'a> {
    pub fn new(game: &'a Game) -> Self {
        Self { game }
    }
}

impl fmt::Display for GameDetail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let game = self.game;
        writeln!(f, "id: {}", game.id)?;
        writeln!(f, "started: {}", date(game.started, TIMESTAMP_FORMAT))?;
        writeln!(f, "finished: {}", date(game.finished, TIMESTAMP_FORMAT))?;
        let execution_time = game
            .execution_time()
            .map(|d| format!("{:.3}s", d.num_milliseconds() as f64 / 1000.0));
        writeln!(f, "execution_time: {}", or_dash(execution_time))?;
        writeln!(f, "left_agent: {} ({})", game.left_name, game.left_agent_id)?;
        writeln!(f, "right_agent: {} ({})", game.right_name, game.right_agent_id)?;
        writeln!(f, "status: {}", game.status)?;
        writeln!(f, "result: {}", game.result)?;
        writeln!(f, "rating: {}", or_dash(rating_line(game)))?;
        let rewards = game.total_rewards().map(|(l, r)| format!("{l} - {r}"));
        writeln!(f, "rewards: {}", or_dash(rewards))?;
        let expected = game
            .total_expected_rewards()
            .map(|(l, r)| format!("{} - {}", l as i64, r as i64));
        writeln!(f, "expected_rewards: {}", or_dash(expected))?;

        writeln!(f, "\nthreshold distribution:")?;
        match threshold_distribution(game) {
            Some(table) => write!(f, "{table}")?,
            None => writeln!(f, "-")?,
        }
        writeln!(f, "\nrewards over time:")?;
        match rewards_over_time(game) {
            Some(table) => write!(f, "{table}"),
            None => writeln!(f, "-"),
        }
    }
}
