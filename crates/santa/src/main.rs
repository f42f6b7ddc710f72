use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use santa::models::{GameResult, GameStatus, NewAgent, Replay, SantaConfig};
use santa::report::{self, AgentDetail, GameDetail};
use santa::store::{AgentFilter, GameFilter};
use santa::{not_found, open_store};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "santa", about = "Santa 2020 leaderboard administration")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/santa.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage registered agents
    #[command(subcommand)]
    Agent(AgentCommand),
    /// Inspect recorded games
    #[command(subcommand)]
    Game(GameCommand),
}

#[derive(Subcommand, Debug)]
enum AgentCommand {
    /// List agents, best rated first
    List {
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Show an agent with its statistics and recent games
    Show { id: i64 },
    /// Register a new agent
    Add {
        #[arg(long)]
        name: String,
        /// Agent program, run directly or through the interpreter configured for its extension
        #[arg(long)]
        file: String,
        #[arg(long)]
        source: Option<String>,
        /// Keep the agent out of rotation
        #[arg(long)]
        disabled: bool,
        /// Starting rating; defaults to the configured initial rating
        #[arg(long)]
        rating: Option<f64>,
    },
    /// Change an agent's fields
    Set {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        rating: Option<f64>,
    },
    /// Delete an agent and all of its games
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum GameCommand {
    /// List games, most recent first
    List {
        /// Left agent id
        #[arg(long)]
        left: Option<i64>,
        /// Right agent id
        #[arg(long)]
        right: Option<i64>,
        #[arg(long)]
        status: Option<GameStatus>,
        #[arg(long)]
        result: Option<GameResult>,
        /// Only games started after this RFC 3339 time
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Show a game with its derived metrics
    Show { id: i64 },
    /// Print the step-by-step replay of a game as JSON
    Replay {
        id: i64,
        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Delete a game
    Delete { id: i64 },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: SantaConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse config")?;

    match cli.command {
        Command::Agent(command) => agent(&config, command),
        Command::Game(command) => game(&config, command),
    }
}

fn agent(config: &SantaConfig, command: AgentCommand) -> Result<()> {
    let store = open_store(config)
        .with_context(|| format!("Failed to open database: {}", config.database.sqlite_path))?;

    match command {
        AgentCommand::List { enabled } => {
            let agents = store.list_agents(&AgentFilter { enabled })?;
            print!("{}", report::agent_list(&agents));
        }
        AgentCommand::Show { id } => {
            let detail = AgentDetail::load(&store, id, config.reports.last_games)
                .map_err(not_found("agent", id))?;
            print!("{detail}");
        }
        AgentCommand::Add {
            name,
            file,
            source,
            disabled,
            rating,
        } => {
            let agent = store.insert_agent(&NewAgent {
                name,
                source,
                file: Some(file),
                enabled: !disabled,
                rating: Some(rating.unwrap_or(config.rating.initial)),
            })?;
            info!(agent_id = agent.id, name = %agent.name, "Agent added");
            println!("{} - {agent}", agent.id);
        }
        AgentCommand::Set {
            id,
            name,
            file,
            source,
            enabled,
            rating,
        } => {
            let mut agent = store.require_agent(id).map_err(not_found("agent", id))?;
            if let Some(name) = name {
                agent.name = name;
            }
            if let Some(file) = file {
                agent.file = Some(file);
            }
            if let Some(source) = source {
                agent.source = Some(source);
            }
            if let Some(enabled) = enabled {
                agent.enabled = enabled;
            }
            if let Some(rating) = rating {
                agent.rating = rating;
            }
            store.update_agent(&agent)?;
            info!(agent_id = id, "Agent updated");
            println!("{} - {agent}", agent.id);
        }
        AgentCommand::Delete { id } => {
            if !store.delete_agent(id)? {
                bail!("Can't find agent with id {id}.");
            }
            println!("Deleted agent {id}");
        }
    }
    Ok(())
}

fn game(config: &SantaConfig, command: GameCommand) -> Result<()> {
    let store = open_store(config)
        .with_context(|| format!("Failed to open database: {}", config.database.sqlite_path))?;

    match command {
        GameCommand::List {
            left,
            right,
            status,
            result,
            since,
            limit,
        } => {
            let games = store.list_games(&GameFilter {
                left_agent: left,
                right_agent: right,
                agent: None,
                status,
                result,
                started_after: since,
                limit: Some(limit),
            })?;
            print!("{}", report::game_list(&games));
        }
        GameCommand::Show { id } => {
            let game = store.require_game(id).map_err(not_found("game", id))?;
            print!("{}", GameDetail::new(&game));
        }
        GameCommand::Replay { id, pretty } => {
            let game = store.require_game(id).map_err(not_found("game", id))?;
            let Some(replay) = Replay::from_game(&game) else {
                bail!("Can't create a replay.");
            };
            let output = if pretty {
                serde_json::to_string_pretty(&replay)?
            } else {
                serde_json::to_string(&replay)?
            };
            println!("{output}");
        }
        GameCommand::Delete { id } => {
            if !store.delete_game(id)? {
                bail!("Can't find game with id {id}.");
            }
            info!(game_id = id, "Game deleted");
            println!("Deleted game {id}");
        }
    }
    Ok(())
}
