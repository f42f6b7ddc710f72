use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use santa_models::{Agent, EnvironmentConfig, PlayersConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use crate::error::ArenaError;
use crate::player::{AgentConfiguration, AgentRequest, Observation, Player, PlayerFactory};

/// Extra time granted for the first action, which includes program startup.
pub const STARTUP_GRACE: Duration = Duration::from_secs(10);

/// An agent program driven over stdin/stdout.
///
/// Protocol: one JSON line `{"observation": ..., "configuration": ...}` per
/// step on the program's stdin, answered by one line holding the bandit index.
pub struct ProcessPlayer {
    name: String,
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    act_timeout: Duration,
    first_action: bool,
}

impl ProcessPlayer {
    /// Launch `file`, through `interpreter` when one is given.
    pub fn spawn(
        name: impl Into<String>,
        file: &str,
        interpreter: Option<&str>,
        act_timeout: Duration,
    ) -> Result<Self, ArenaError> {
        let name = name.into();
        let mut command = match interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.arg(file);
                command
            }
            None => Command::new(file),
        };
        debug!(player = %name, file, ?interpreter, "Spawning agent program");

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ArenaError::Player {
                player: name.clone(),
                message: format!("failed to spawn {file}: {e}"),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| ArenaError::Player {
            player: name.clone(),
            message: "stdin not captured".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| ArenaError::Player {
            player: name.clone(),
            message: "stdout not captured".to_string(),
        })?;

        Ok(Self {
            name,
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            act_timeout,
            first_action: true,
        })
    }

    fn failure(&self, message: String) -> ArenaError {
        ArenaError::Player {
            player: self.name.clone(),
            message,
        }
    }
}

#[async_trait]
impl Player for ProcessPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn act(
        &mut self,
        observation: &Observation,
        configuration: &AgentConfiguration,
    ) -> Result<usize, ArenaError> {
        let mut line = serde_json::to_string(&AgentRequest {
            observation,
            configuration,
        })?;
        line.push('\n');

        let timeout = if self.first_action {
            self.act_timeout + STARTUP_GRACE
        } else {
            self.act_timeout
        };
        self.first_action = false;

        let stdin = &mut self.stdin;
        let stdout = &mut self.stdout;
        let exchange = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await?;
            stdout.next_line().await
        };
        let response = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| ArenaError::Timeout {
                player: self.name.clone(),
                millis: timeout.as_millis() as u64,
            })?
            .map_err(|e| self.failure(format!("I/O error: {e}")))?;

        let Some(response) = response else {
            return Err(self.failure("program exited before answering".to_string()));
        };
        response
            .trim()
            .parse::<usize>()
            .map_err(|_| self.failure(format!("expected a bandit index, got '{}'", response.trim())))
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.child.kill().await {
            warn!(player = %self.name, error = %e, "Failed to stop agent program");
        }
    }
}

/// Launches agents as [`ProcessPlayer`]s using the configured interpreters.
pub struct ProcessPlayerFactory {
    players: PlayersConfig,
}

impl ProcessPlayerFactory {
    pub fn new(players: PlayersConfig) -> Self {
        Self { players }
    }
}

impl PlayerFactory for ProcessPlayerFactory {
    fn create(
        &self,
        agent: &Agent,
        config: &EnvironmentConfig,
    ) -> Result<Box<dyn Player>, ArenaError> {
        let file = agent
            .file
            .as_deref()
            .filter(|f| !f.is_empty())
            .ok_or(ArenaError::MissingFile(agent.id))?;
        let player = ProcessPlayer::spawn(
            agent.name.clone(),
            file,
            self.players.interpreter_for(file),
            Duration::from_millis(config.act_timeout_ms),
        )?;
        Ok(Box::new(player))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let result = ProcessPlayer::spawn(
            "ghost",
            "/nonexistent/agent/program",
            None,
            Duration::from_millis(100),
        );
        assert!(matches!(result, Err(ArenaError::Player { .. })));
    }

    #[test]
    fn factory_requires_file() {
        let factory = ProcessPlayerFactory::new(PlayersConfig::default());
        let agent = Agent {
            id: 4,
            name: "fileless".to_string(),
            source: None,
            rating: 600.0,
            file: None,
            enabled: true,
            created_at: None,
        };
        let result = factory.create(&agent, &EnvironmentConfig::default());
        assert!(matches!(result, Err(ArenaError::MissingFile(4))));
    }
}
