use std::io::Write;

use rand::rngs::StdRng;
use rand::SeedableRng;
use santa_arena::{choose_agents, Arena, ArenaError};
use santa_store::Store;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::RunnerError;

/// How a batch of games ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub played: u64,
    pub cancelled: bool,
}

/// Plays games between randomly paired agents until the requested count is
/// reached or the run is cancelled.
pub struct GameRunner {
    arena: Arena,
    store: Store,
    rng: StdRng,
    cancel: CancellationToken,
}

impl GameRunner {
    /// Pairing is seeded from the environment seed when one is configured.
    pub fn new(arena: Arena, store: Store) -> Self {
        let rng = match arena.settings().environment.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            arena,
            store,
            rng,
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a CancellationToken that stops the run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Play `num_games` games, or until cancelled when `None`, writing one
    /// `<count> - <game>` line per finished game to `out`.
    ///
    /// Stops at the first failed game and returns its error.
    pub async fn run<W: Write>(
        &mut self,
        num_games: Option<u64>,
        out: &mut W,
    ) -> Result<RunSummary, RunnerError> {
        let agents = self.store.playable_agent_ids()?;
        if agents.len() < 2 {
            return Err(RunnerError::NotEnoughAgents);
        }
        info!(agents = agents.len(), ?num_games, "Starting games");

        let mut played = 0u64;
        loop {
            if num_games.is_some_and(|n| played >= n) {
                break;
            }
            if self.cancel.is_cancelled() {
                return Ok(self.stopped(played));
            }

            let (left, right) =
                choose_agents(&agents, &mut self.rng).ok_or(RunnerError::NotEnoughAgents)?;
            let game = match self
                .arena
                .run_game_until(&mut self.store, left, right, &self.cancel)
                .await
            {
                Ok(game) => game,
                Err(ArenaError::Cancelled) => return Ok(self.stopped(played)),
                Err(e) => return Err(e.into()),
            };

            played += 1;
            writeln!(out, "{played} - {game}")?;
        }

        info!(played, "All games played");
        Ok(RunSummary {
            played,
            cancelled: false,
        })
    }

    fn stopped(&self, played: u64) -> RunSummary {
        info!(played, "Run cancelled");
        RunSummary {
            played,
            cancelled: true,
        }
    }
}
