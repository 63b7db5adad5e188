mod http;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use moodiq_engine::{EngineConfig, MoodEngine};
use moodiq_store::{MoodRecordStore, NewMoodEvent, SqliteMoodStore};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_STORE_NAME: &str = "moods.db";

#[derive(Parser)]
#[command(name = "moodiq")]
#[command(author, version, about = "Mood analytics - retrieval-backed answers over emotion events")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the mood record store (default: moods.db in the working directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Path to an engine config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Allowed CORS origin (all origins when unset)
        #[arg(long)]
        cors_origin: Option<String>,
    },

    /// Ask a free-text question about the recorded moods
    Query {
        /// The question
        question: String,

        /// Restrict to one actor
        #[arg(short, long)]
        actor: Option<String>,
    },

    /// Print the insight report
    Insights {
        /// Restrict to one actor
        #[arg(short, long)]
        actor: Option<String>,
    },

    /// Rebuild the record cache and vector index from the store
    Rebuild,

    /// Record a mood event (collaborator write path)
    Record {
        /// Actor the emotion was observed for
        #[arg(long)]
        actor: String,

        /// Emotion label
        #[arg(long)]
        emotion: String,

        /// Confidence score, 0-100
        #[arg(long)]
        confidence: f64,

        /// Detection method tag
        #[arg(long)]
        method: Option<String>,

        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,

        /// Actor display name for the directory
        #[arg(long)]
        name: Option<String>,

        /// Actor group for the directory
        #[arg(long)]
        group: Option<String>,
    },

    /// Show store and engine statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store_path = cli
        .store
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_NAME));
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port, cors_origin } => serve(&store_path, config, port, cors_origin).await,
        Commands::Query { question, actor } => query(&store_path, config, &question, actor.as_deref()),
        Commands::Insights { actor } => insights(&store_path, config, actor.as_deref()),
        Commands::Rebuild => rebuild(&store_path, config),
        Commands::Record {
            actor,
            emotion,
            confidence,
            method,
            notes,
            name,
            group,
        } => record(&store_path, &actor, &emotion, confidence, method, notes, name, group),
        Commands::Stats => stats(&store_path, config),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            serde_json::from_str(&raw).with_context(|| format!("Invalid config {:?}", path))
        }
        None => Ok(EngineConfig::default()),
    }
}

fn open_engine(store_path: &Path, config: EngineConfig) -> Result<(Arc<SqliteMoodStore>, MoodEngine)> {
    let store = Arc::new(SqliteMoodStore::open(store_path)?);
    let engine = MoodEngine::new(store.clone() as Arc<dyn MoodRecordStore>, config);
    Ok((store, engine))
}

async fn serve(
    store_path: &Path,
    config: EngineConfig,
    port: u16,
    cors_origin: Option<String>,
) -> Result<()> {
    info!("Starting moodiq HTTP server");
    info!("Store: {:?}", store_path);

    let (store, engine) = open_engine(store_path, config)?;
    engine.rebuild_index();

    http::serve_http(engine, store, port, cors_origin).await
}

fn query(store_path: &Path, config: EngineConfig, question: &str, actor: Option<&str>) -> Result<()> {
    let (_store, engine) = open_engine(store_path, config)?;
    let answer = engine.query(question, actor)?;
    println!("{}", answer);
    Ok(())
}

fn insights(store_path: &Path, config: EngineConfig, actor: Option<&str>) -> Result<()> {
    let (_store, engine) = open_engine(store_path, config)?;
    println!("{}", engine.insights(actor));
    Ok(())
}

fn rebuild(store_path: &Path, config: EngineConfig) -> Result<()> {
    let (_store, engine) = open_engine(store_path, config)?;
    let success = engine.rebuild_index();
    let stats = engine.stats();

    println!("Rebuild {}", if success { "complete" } else { "found no events" });
    println!("  Cached events: {}", stats.cached_events);
    println!("  Indexed documents: {}", stats.indexed_documents);

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn record(
    store_path: &Path,
    actor: &str,
    emotion: &str,
    confidence: f64,
    method: Option<String>,
    notes: Option<String>,
    name: Option<String>,
    group: Option<String>,
) -> Result<()> {
    let store = SqliteMoodStore::open(store_path)?;

    if name.is_some() || group.is_some() {
        store.upsert_actor(
            actor,
            name.as_deref().unwrap_or(actor),
            group.as_deref().unwrap_or("Unknown"),
        )?;
    }

    let id = store.record_event(&NewMoodEvent {
        actor_id: actor.to_string(),
        emotion: emotion.to_string(),
        confidence,
        detection_method: method,
        notes,
        timestamp: None,
    })?;

    println!("Recorded mood event {} for {}", id, actor);
    Ok(())
}

fn stats(store_path: &Path, config: EngineConfig) -> Result<()> {
    let (store, engine) = open_engine(store_path, config)?;
    engine.rebuild_index();
    let engine_stats = engine.stats();

    println!("moodiq statistics");
    println!("=================");
    println!("Store: {:?}", store_path);
    println!("Store events: {}", store.event_count()?);
    println!("Cached events: {}", engine_stats.cached_events);
    println!("Indexed documents: {}", engine_stats.indexed_documents);
    println!("Capability: {:?}", engine_stats.capability);

    let tallies = store.emotion_statistics(None)?;
    if !tallies.is_empty() {
        println!("\nEmotions:");
        for tally in tallies {
            println!(
                "  {:12} {:4}  avg confidence {:.1}%",
                tally.emotion, tally.count, tally.average_confidence
            );
        }
    }

    Ok(())
}
