use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use reel_ops::init_tracing;
use reel_service::{MovieService, MovieServiceImpl};
use reel_storage::InMemoryMovieRepository;
use reel_types::config::{OpsConfig, ReelConfig, StorageConfig, StreamConfig};
use serde::Serialize;
use tracing::info;

const DEFAULT_CONFIG: &str = "configs/dev.toml";

#[derive(Debug, Parser)]
#[command(name = "reel", version, about = "Query movies and follow their live event feed")]
struct Cli {
    /// Config file; falls back to $REEL_CONFIG, then configs/dev.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a single movie.
    Movie { id: String },
    /// Print every stored movie, one per line.
    Movies,
    /// Follow the event stream for a movie id until Ctrl-C.
    Events {
        id: String,
        /// Stop after this many events.
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config);
    init_tracing(&config.ops)?;

    let repository = match &config.storage.seed_path {
        Some(path) => InMemoryMovieRepository::from_seed_file(path)?,
        None => InMemoryMovieRepository::new(),
    };
    let service = MovieServiceImpl::with_config(repository, config.stream.clone());

    match cli.command {
        Command::Movie { id } => match service.get_movie_by_id(&id).await? {
            Some(movie) => print_json(&movie)?,
            None => bail!("movie '{id}' not found"),
        },
        Command::Movies => {
            let mut movies = service.get_all_movies();
            while let Some(movie) = movies.next().await {
                print_json(&movie?)?;
            }
        }
        Command::Events { id, limit } => follow_events(&service, &id, limit).await?,
    }
    Ok(())
}

async fn follow_events<S: MovieService>(service: &S, id: &str, limit: Option<usize>) -> Result<()> {
    let mut events = service.events(id);
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);
    let mut seen = 0usize;
    loop {
        if limit.is_some_and(|max| seen >= max) {
            break;
        }
        tokio::select! {
            next = events.next() => match next {
                Some(event) => {
                    print_json(&event)?;
                    seen += 1;
                }
                None => break,
            },
            signal = &mut interrupted => {
                signal.context("failed to listen for ctrl-c")?;
                info!("Interrupted; closing event stream for '{}'", id);
                break;
            }
        }
    }
    events.cancel();
    info!("Printed {} events for '{}'", seen, id);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let line = serde_json::to_string(value).context("failed to encode output")?;
    println!("{line}");
    Ok(())
}

fn load_config(from_args: Option<PathBuf>) -> ReelConfig {
    let from_env = env::var("REEL_CONFIG").ok().map(PathBuf::from);
    let path = from_args
        .or(from_env)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    match ReelConfig::from_file(&path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                warn_fallback(&path, &err.to_string());
                default_config()
            } else {
                cfg
            }
        }
        Err(err) => {
            warn_fallback(&path, &err.to_string());
            default_config()
        }
    }
}

// Tracing is not initialised until the config is known.
fn warn_fallback(path: &Path, reason: &str) {
    eprintln!(
        "Failed to use config '{}': {reason}. Falling back to internal defaults.",
        path.display()
    );
}

fn default_config() -> ReelConfig {
    let config = ReelConfig {
        storage: StorageConfig { seed_path: None },
        stream: StreamConfig::default(),
        ops: OpsConfig::default(),
    };
    debug_assert!(config.validate().is_ok());
    config
}
