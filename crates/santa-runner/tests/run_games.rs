use std::sync::Arc;

use santa_arena::test_support::{Strategy, StrategyFactory};
use santa_arena::{Arena, GameSettings};
use santa_models::{EnvironmentConfig, GameStatus, NewAgent};
use santa_runner::{GameRunner, RunnerError};
use santa_store::{AgentFilter, GameFilter, Store};
use tempfile::TempDir;

fn settings() -> GameSettings {
    GameSettings {
        environment: EnvironmentConfig {
            bandit_count: 10,
            episode_steps: 51,
            seed: Some(2020),
            ..EnvironmentConfig::default()
        },
        k_factor: 32.0,
    }
}

fn open_store(dir: &TempDir) -> Store {
    Store::open(dir.path().join("santa.db").to_str().unwrap()).unwrap()
}

fn runner(store: Store, factory: StrategyFactory) -> GameRunner {
    GameRunner::new(Arena::new(Arc::new(factory), settings()), store)
}

fn league() -> StrategyFactory {
    StrategyFactory::new()
        .with("greedy", Strategy::Greedy)
        .with("round-robin", Strategy::RoundRobin)
        .with("stubborn", Strategy::Fixed(4))
}

fn add(store: &Store, name: &str) -> i64 {
    store
        .insert_agent(&NewAgent::new(name, Some(format!("agents/{name}"))))
        .unwrap()
        .id
}

#[tokio::test]
async fn plays_requested_number_of_games() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    for name in ["greedy", "round-robin", "stubborn"] {
        add(&store, name);
    }

    let mut runner = runner(store, league());
    let mut out = Vec::new();
    let summary = runner.run(Some(6), &mut out).await.unwrap();

    assert_eq!(summary.played, 6);
    assert!(!summary.cancelled);

    let finished = GameFilter {
        status: Some(GameStatus::Finished),
        ..GameFilter::default()
    };
    assert_eq!(runner.store().count_games(&finished).unwrap(), 6);
    assert_eq!(runner.store().count_games(&GameFilter::default()).unwrap(), 6);

    let out = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("1 - Game '"));
    assert!(lines[5].starts_with("6 - Game '"));
}

#[tokio::test]
async fn ratings_sum_is_conserved() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    for name in ["greedy", "round-robin", "stubborn"] {
        add(&store, name);
    }

    let mut runner = runner(store, league());
    runner.run(Some(10), &mut Vec::new()).await.unwrap();

    let agents = runner.store().list_agents(&AgentFilter::default()).unwrap();
    let total: f64 = agents.iter().map(|a| a.rating).sum();
    assert!((total - 1800.0).abs() < 1e-6);
    assert!(agents.iter().any(|a| (a.rating - 600.0).abs() > 1e-9));
}

#[tokio::test]
async fn needs_two_playable_agents() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    add(&store, "greedy");
    let mut disabled = NewAgent::new("stubborn", Some("agents/stubborn".to_string()));
    disabled.enabled = false;
    store.insert_agent(&disabled).unwrap();
    store.insert_agent(&NewAgent::new("round-robin", None)).unwrap();

    let mut runner = runner(store, league());
    let err = runner.run(Some(1), &mut Vec::new()).await.unwrap_err();

    assert!(matches!(err, RunnerError::NotEnoughAgents));
    assert_eq!(err.to_string(), "There must be at least 2 agents.");
}

#[tokio::test]
async fn disabled_agents_sit_out() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    add(&store, "greedy");
    add(&store, "round-robin");
    let stubborn = add(&store, "stubborn");
    let mut agent = store.require_agent(stubborn).unwrap();
    agent.enabled = false;
    store.update_agent(&agent).unwrap();

    let mut runner = runner(store, league());
    runner.run(Some(4), &mut Vec::new()).await.unwrap();

    assert_eq!(runner.store().num_games(stubborn).unwrap(), 0);
    assert_eq!(runner.store().require_agent(stubborn).unwrap().rating, 600.0);
}

#[tokio::test]
async fn stops_at_first_failure() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    add(&store, "greedy");
    add(&store, "broken");
    let factory = StrategyFactory::new()
        .with("greedy", Strategy::Greedy)
        .with("broken", Strategy::Invalid);

    let mut runner = runner(store, factory);
    let mut out = Vec::new();
    let err = runner.run(Some(5), &mut out).await.unwrap_err();

    assert!(matches!(err, RunnerError::Arena(_)));
    assert!(out.is_empty());
    let deleted = GameFilter {
        status: Some(GameStatus::Deleted),
        ..GameFilter::default()
    };
    assert_eq!(runner.store().count_games(&deleted).unwrap(), 1);
    assert_eq!(runner.store().count_games(&GameFilter::default()).unwrap(), 1);
}

#[tokio::test]
async fn cancelled_run_stops_before_next_game() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    add(&store, "greedy");
    add(&store, "stubborn");

    let mut runner = runner(store, league());
    runner.cancel_token().cancel();
    let summary = runner.run(None, &mut Vec::new()).await.unwrap();

    assert_eq!(
        summary,
        santa_runner::RunSummary {
            played: 0,
            cancelled: true
        }
    );
    assert_eq!(runner.store().count_games(&GameFilter::default()).unwrap(), 0);
}

#[tokio::test]
async fn cancelling_mid_game_deletes_it() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    add(&store, "greedy");
    add(&store, "stalled");
    let factory = StrategyFactory::new()
        .with("greedy", Strategy::Greedy)
        .with("stalled", Strategy::Stall);

    let mut runner = runner(store, factory);
    let cancel = runner.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        cancel.cancel();
    });
    let summary = runner.run(None, &mut Vec::new()).await.unwrap();

    assert_eq!(summary.played, 0);
    assert!(summary.cancelled);
    let games = runner.store().list_games(&GameFilter::default()).unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].status, GameStatus::Deleted);
    let started = GameFilter {
        status: Some(GameStatus::Started),
        ..GameFilter::default()
    };
    assert_eq!(runner.store().count_games(&started).unwrap(), 0);
}
