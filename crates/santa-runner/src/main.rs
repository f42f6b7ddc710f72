use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use santa_arena::{Arena, GameSettings, ProcessPlayerFactory};
use santa_runner::{load_config, GameRunner};
use santa_store::Store;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "run_games",
    about = "Play Santa 2020 games between randomly paired agents and update the leaderboard"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/santa.toml")]
    config: String,

    /// Number of games to play; runs until Ctrl-C when omitted
    #[arg(short = 'n', long = "num-games")]
    num_games: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config =
        load_config(&cli.config).with_context(|| format!("Failed to load config: {}", cli.config))?;

    let db_path = &config.database.sqlite_path;
    if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let store = Store::open(db_path).with_context(|| format!("Failed to open database: {db_path}"))?;

    let factory = Arc::new(ProcessPlayerFactory::new(config.players.clone()));
    let arena = Arena::new(factory, GameSettings::from(&config));
    let mut runner = GameRunner::new(arena, store);
    let cancel = runner.cancel_token();

    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received shutdown signal");
        cancel.cancel();
    });

    let mut stdout = std::io::stdout().lock();
    runner.run(cli.num_games, &mut stdout).await?;

    Ok(())
}
