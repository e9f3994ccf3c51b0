use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use scoreboard_db_postgres::{PostgresStorage, redact_url};
use scoreboard_server::config::loader::load_config;
use scoreboard_server::{LeaderboardError, LeaderboardService, create_store_client, observability};
use scoreboard_storage::{ErrorCategory, NewUser, StorageError};

#[derive(Parser)]
#[command(name = "scoreboard")]
#[command(about = "Live game rankings backed by Redis and PostgreSQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to scoreboard.toml when present)
    #[arg(short, long, global = true, env = "SCOREBOARD_CONFIG")]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the database schema
    Migrate,
    /// Register a user
    RegisterUser {
        username: String,
        email: String,
        #[arg(long, default_value = "")]
        country: String,
        #[arg(long)]
        admin: bool,
    },
    /// Create a game
    CreateGame { name: String },
    /// List all games
    Games,
    /// Submit a score for a user in a game
    Submit {
        user_id: i64,
        game_id: i64,
        #[arg(allow_negative_numbers = true)]
        score: f64,
    },
    /// Show a game's leaderboard window (0-based, inclusive)
    Leaderboard {
        game_id: i64,
        #[arg(long, default_value_t = 0)]
        start: usize,
        #[arg(long, default_value_t = 9)]
        end: usize,
    },
    /// Show a user's rank in one game
    Rank { user_id: i64, game_id: i64 },
    /// Show a user's rank in every game
    Ranks { user_id: i64 },
    /// Top players of a game with their profiles
    Top {
        game_id: i64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    observability::init_tracing("info");

    if let Err(e) = run(Cli::parse()).await {
        match error_category(&e) {
            Some(category) => {
                tracing::error!(error = %format!("{e:#}"), %category, "command failed")
            }
            None => tracing::error!(error = %format!("{e:#}"), "command failed"),
        }
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!(e))
        .context("Configuration error")?;
    if let Err(e) = observability::apply_logging_level(&cfg.logging.level) {
        tracing::warn!(error = %e, "keeping the default log level");
    }

    let mut pg_config = cfg.storage.postgres.clone();
    if matches!(cli.command, Commands::Migrate) {
        pg_config.run_migrations = true;
    }
    tracing::info!(url = %redact_url(&pg_config.connection_url()), "Connecting to PostgreSQL");
    let storage = PostgresStorage::new(pg_config)
        .await
        .context("failed to open durable store")?;

    if matches!(cli.command, Commands::Migrate) {
        tracing::info!("Database schema is up to date");
        return Ok(());
    }

    let client = create_store_client(&cfg.redis).await;
    tracing::info!(backend = client.backend_name(), "Store client ready");
    let service = LeaderboardService::from_config(client, Arc::new(storage), &cfg);

    match cli.command {
        Commands::Migrate => {}
        Commands::RegisterUser {
            username,
            email,
            country,
            admin,
        } => {
            let user = NewUser {
                username,
                email,
                country,
                is_admin: admin,
            };
            print_json(&service.register_user(&user).await?)?;
        }
        Commands::CreateGame { name } => print_json(&service.create_game(&name).await?)?,
        Commands::Games => print_json(&service.list_games().await?)?,
        Commands::Submit {
            user_id,
            game_id,
            score,
        } => print_json(&service.submit_score(user_id, game_id, score).await?)?,
        Commands::Leaderboard {
            game_id,
            start,
            end,
        } => print_json(&service.leaderboard(game_id, start, end).await?)?,
        Commands::Rank { user_id, game_id } => {
            let ranking = service.user_ranking(user_id, game_id).await?;
            if ranking.is_none() {
                tracing::warn!(user_id, game_id, "user has no score in this game");
            }
            print_json(&ranking)?;
        }
        Commands::Ranks { user_id } => {
            let ranks = service.user_rankings(user_id).await?;
            if ranks.is_none() {
                tracing::warn!(user_id, "no ranking information found");
            }
            print_json(&ranks)?;
        }
        Commands::Top { game_id, limit } => {
            print_json(&service.top_players(game_id, limit).await?)?
        }
    }
    Ok(())
}

/// Category of a failed command, when it came from the leaderboard or the
/// durable store.
fn error_category(err: &anyhow::Error) -> Option<ErrorCategory> {
    if let Some(err) = err.downcast_ref::<LeaderboardError>() {
        return Some(err.category());
    }
    err.downcast_ref::<StorageError>().map(StorageError::category)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
