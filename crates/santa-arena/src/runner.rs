use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use santa_models::{Agent, EnvironmentConfig, Game, GameOutcome, GameResult, NewGame, SantaConfig};
use santa_store::Store;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::elo::{self, DEFAULT_K_FACTOR};
use crate::environment::{self, MabEnvironment};
use crate::error::ArenaError;
use crate::player::{AgentConfiguration, Player, PlayerFactory};

/// Parameters shared by every game an [`Arena`] runs.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    pub environment: EnvironmentConfig,
    pub k_factor: f64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            environment: EnvironmentConfig::default(),
            k_factor: DEFAULT_K_FACTOR,
        }
    }
}

impl From<&SantaConfig> for GameSettings {
    fn from(config: &SantaConfig) -> Self {
        Self {
            environment: config.environment.clone(),
            k_factor: config.rating.k_factor,
        }
    }
}

/// Everything recorded while an episode is played.
struct Trajectory {
    initial_thresholds: Vec<u8>,
    left_actions: Vec<u8>,
    right_actions: Vec<u8>,
    left_rewards: Vec<u16>,
    right_rewards: Vec<u16>,
}

/// Plays games between registered agents and records them in the store.
pub struct Arena {
    factory: Arc<dyn PlayerFactory>,
    settings: GameSettings,
}

impl Arena {
    pub fn new(factory: Arc<dyn PlayerFactory>, settings: GameSettings) -> Self {
        Self { factory, settings }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Play one game and persist its outcome along with both new ratings.
    ///
    /// If a player fails the game row is marked DELETED, ratings stay
    /// untouched and the player's error is returned.
    pub async fn run_game(
        &self,
        store: &mut Store,
        left_id: i64,
        right_id: i64,
    ) -> Result<Game, ArenaError> {
        self.run_game_until(store, left_id, right_id, &CancellationToken::new())
            .await
    }

    /// Like [`Arena::run_game`], but stops the episode when `cancel` fires.
    /// An interrupted game is marked DELETED and [`ArenaError::Cancelled`]
    /// is returned.
    pub async fn run_game_until(
        &self,
        store: &mut Store,
        left_id: i64,
        right_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Game, ArenaError> {
        if left_id == right_id {
            return Err(ArenaError::SameAgent);
        }
        let left = store
            .get_agent(left_id)?
            .ok_or(ArenaError::AgentNotFound(left_id))?;
        let right = store
            .get_agent(right_id)?
            .ok_or(ArenaError::AgentNotFound(right_id))?;
        environment::validate(&self.settings.environment)?;

        let game = store.create_game(&NewGame {
            left_agent_id: left.id,
            right_agent_id: right.id,
            left_current_rating: left.rating,
            right_current_rating: right.rating,
            configuration: Some(self.settings.environment.clone()),
        })?;
        info!(game_id = game.id, left = %left.name, right = %right.name, "Game started");
        let start = Instant::now();

        let trajectory = match self.play(game.id, &left, &right, cancel).await {
            Ok(trajectory) => trajectory,
            Err(ArenaError::Cancelled) => {
                info!(game_id = game.id, "Game cancelled");
                store.mark_deleted(game.id)?;
                return Err(ArenaError::Cancelled);
            }
            Err(e) => {
                warn!(game_id = game.id, error = %e, "Game aborted");
                store.mark_deleted(game.id)?;
                return Err(e);
            }
        };

        let left_total = trajectory.left_rewards.last().copied().unwrap_or(0);
        let right_total = trajectory.right_rewards.last().copied().unwrap_or(0);
        let result = GameResult::from_totals(left_total, right_total);
        let (left_new_rating, right_new_rating) =
            elo::new_ratings(left.rating, right.rating, result, self.settings.k_factor)?;

        let game = store.record_result(
            game.id,
            &GameOutcome {
                initial_thresholds: trajectory.initial_thresholds,
                left_actions: trajectory.left_actions,
                right_actions: trajectory.right_actions,
                left_rewards: trajectory.left_rewards,
                right_rewards: trajectory.right_rewards,
                result,
                left_new_rating,
                right_new_rating,
            },
        )?;
        info!(
            game_id = game.id,
            %result,
            left_reward = left_total,
            right_reward = right_total,
            elapsed_ms = start.elapsed().as_millis(),
            "Game finished"
        );
        Ok(game)
    }

    async fn play(
        &self,
        game_id: i64,
        left: &Agent,
        right: &Agent,
        cancel: &CancellationToken,
    ) -> Result<Trajectory, ArenaError> {
        let config = &self.settings.environment;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(game_id as u64)),
            None => StdRng::from_entropy(),
        };

        let mut left_player = self.factory.create(left, config)?;
        let mut right_player = match self.factory.create(right, config) {
            Ok(player) => player,
            Err(e) => {
                left_player.shutdown().await;
                return Err(e);
            }
        };

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ArenaError::Cancelled),
            result = play_episode(config, rng, left_player.as_mut(), right_player.as_mut()) => result,
        };
        left_player.shutdown().await;
        right_player.shutdown().await;
        result
    }
}

async fn play_episode(
    config: &EnvironmentConfig,
    rng: StdRng,
    left: &mut dyn Player,
    right: &mut dyn Player,
) -> Result<Trajectory, ArenaError> {
    let agent_config = AgentConfiguration::from(config);
    let mut env = MabEnvironment::new(config.clone(), rng)?;
    let steps = config.action_steps();
    let mut trajectory = Trajectory {
        initial_thresholds: env.initial_thresholds().to_vec(),
        left_actions: Vec::with_capacity(steps),
        right_actions: Vec::with_capacity(steps),
        left_rewards: Vec::with_capacity(steps),
        right_rewards: Vec::with_capacity(steps),
    };

    while !env.is_done() {
        let left_observation = env.observation(0);
        let right_observation = env.observation(1);
        let (left_action, right_action) = tokio::join!(
            left.act(&left_observation, &agent_config),
            right.act(&right_observation, &agent_config),
        );
        let actions = [left_action?, right_action?];
        let rewards = env.step(actions)?;

        // step() rejects indices >= bandit_count, which is at most 256.
        trajectory.left_actions.push(actions[0] as u8);
        trajectory.right_actions.push(actions[1] as u8);
        trajectory.left_rewards.push(rewards[0]);
        trajectory.right_rewards.push(rewards[1]);
    }
    debug!(steps = env.step_count(), "Episode complete");
    Ok(trajectory)
}

/// Pick an ordered pair of distinct agents uniformly at random.
pub fn choose_agents<R: Rng + ?Sized>(ids: &[i64], rng: &mut R) -> Option<(i64, i64)> {
    if ids.len() < 2 {
        return None;
    }
    let left = rng.gen_range(0..ids.len());
    let mut right = rng.gen_range(0..ids.len() - 1);
    if right >= left {
        right += 1;
    }
    Some((ids[left], ids[right]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Strategy, StrategyFactory};
    use santa_models::{GameStatus, NewAgent};
    use santa_store::GameFilter;

    fn settings() -> GameSettings {
        GameSettings {
            environment: EnvironmentConfig {
                bandit_count: 5,
                episode_steps: 21,
                seed: Some(3),
                ..EnvironmentConfig::default()
            },
            k_factor: DEFAULT_K_FACTOR,
        }
    }

    fn arena(left: Strategy, right: Strategy) -> Arena {
        let factory = StrategyFactory::new().with("left", left).with("right", right);
        Arena::new(Arc::new(factory), settings())
    }

    fn store() -> (Store, Agent, Agent) {
        let store = Store::open_in_memory().unwrap();
        let left = store.insert_agent(&NewAgent::new("left", None)).unwrap();
        let right = store.insert_agent(&NewAgent::new("right", None)).unwrap();
        (store, left, right)
    }

    #[tokio::test]
    async fn plays_a_full_game() {
        let (mut store, left, right) = store();
        let arena = arena(Strategy::RoundRobin, Strategy::Fixed(2));

        let game = arena.run_game(&mut store, left.id, right.id).await.unwrap();

        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.initial_thresholds.as_ref().unwrap().len(), 5);
        assert_eq!(game.left_actions.as_ref().unwrap().len(), 20);
        assert_eq!(game.right_actions.as_ref().unwrap(), &vec![2u8; 20]);
        assert_eq!(game.left_rewards.as_ref().unwrap().len(), 20);

        let (l, r) = game.total_rewards().unwrap();
        assert_eq!(game.result, GameResult::from_totals(l, r));

        let left_after = store.require_agent(left.id).unwrap();
        let right_after = store.require_agent(right.id).unwrap();
        assert_eq!(Some(left_after.rating), game.left_new_rating);
        assert_eq!(Some(right_after.rating), game.right_new_rating);
        assert!((left_after.rating + right_after.rating - 1200.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn seeded_games_repeat() {
        let (mut first_store, left, right) = store();
        let (mut second_store, _, _) = store();
        let arena = arena(Strategy::Greedy, Strategy::RoundRobin);

        let first = arena.run_game(&mut first_store, left.id, right.id).await.unwrap();
        let second = arena.run_game(&mut second_store, left.id, right.id).await.unwrap();

        assert_eq!(first.initial_thresholds, second.initial_thresholds);
        assert_eq!(first.left_rewards, second.left_rewards);
        assert_eq!(first.right_rewards, second.right_rewards);
    }

    #[tokio::test]
    async fn rejects_same_agent() {
        let (mut store, left, _) = store();
        let arena = arena(Strategy::Fixed(0), Strategy::Fixed(0));
        let err = arena.run_game(&mut store, left.id, left.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Agents must be different");
        assert_eq!(store.count_games(&GameFilter::default()).unwrap(), 0);
    }

    #[tokio::test]
    async fn rejects_unknown_agent() {
        let (mut store, left, _) = store();
        let arena = arena(Strategy::Fixed(0), Strategy::Fixed(0));
        let err = arena.run_game(&mut store, left.id, 99).await.unwrap_err();
        assert_eq!(err.to_string(), "Can't find agent with id 99.");
    }

    #[tokio::test]
    async fn failed_game_is_marked_deleted() {
        let (mut store, left, right) = store();
        let arena = arena(Strategy::Fixed(0), Strategy::Invalid);

        let err = arena.run_game(&mut store, left.id, right.id).await.unwrap_err();
        assert!(matches!(
            err,
            ArenaError::InvalidAction {
                player_index: 1,
                action: 5
            }
        ));

        let games = store.list_games(&GameFilter::default()).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].status, GameStatus::Deleted);
        assert_eq!(store.require_agent(left.id).unwrap().rating, left.rating);
        assert_eq!(store.require_agent(right.id).unwrap().rating, right.rating);
    }

    #[tokio::test]
    async fn player_error_mid_game() {
        let (mut store, left, right) = store();
        let arena = arena(Strategy::FailAt(7), Strategy::Fixed(1));

        let err = arena.run_game(&mut store, left.id, right.id).await.unwrap_err();
        assert!(matches!(err, ArenaError::Player { .. }));
        let deleted = GameFilter {
            status: Some(GameStatus::Deleted),
            ..GameFilter::default()
        };
        assert_eq!(store.count_games(&deleted).unwrap(), 1);
    }

    #[tokio::test]
    async fn cancelled_game_is_marked_deleted() {
        let (mut store, left, right) = store();
        let arena = arena(Strategy::Stall, Strategy::Fixed(1));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let err = arena
            .run_game_until(&mut store, left.id, right.id, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ArenaError::Cancelled));
        let games = store.list_games(&GameFilter::default()).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].status, GameStatus::Deleted);
        assert_eq!(store.require_agent(left.id).unwrap().rating, left.rating);
    }

    #[test]
    fn chooses_distinct_agents() {
        let mut rng = StdRng::seed_from_u64(11);
        let ids = [3, 8, 13];
        for _ in 0..100 {
            let (left, right) = choose_agents(&ids, &mut rng).unwrap();
            assert_ne!(left, right);
            assert!(ids.contains(&left) && ids.contains(&right));
        }
        assert_eq!(choose_agents(&[1, 2], &mut rng).map(|(l, r)| l + r), Some(3));
    }

    #[test]
    fn needs_two_agents() {
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(choose_agents(&[], &mut rng), None);
        assert_eq!(choose_agents(&[4], &mut rng), None);
    }
}
