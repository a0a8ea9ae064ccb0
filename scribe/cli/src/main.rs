//! Scribe CLI - Local Harness for scribe-core
//!
//! Replays captured response streams, previews edit playback, and inspects
//! checkpoint ledgers. Everything runs against local files.
//!
//! # Usage
//!
//! ```bash
//! # Replay an SSE transcript, printing session messages as JSON lines
//! scribe replay capture.sse --chunk 7
//!
//! # Show the playback plan between two files
//! scribe plan before.rs after.rs
//!
//! # Play it with real timing
//! scribe plan before.rs after.rs --play
//!
//! # Inspect a checkpoint ledger
//! scribe ledger ~/.local/share/scribe/checkpoints.json
//!
//! # Verbose logging
//! RUST_LOG=debug scribe replay capture.sse
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;

use scribe_core::config::{default_config_path, default_ledger_path};
use scribe_core::{
    build_plan, load_config_from_path, CheckpointStorage, ConfigOverrides, EditSession,
    JsonFileStorage, PlaybackDriver, ScribeConfig, SessionEvent, SessionMessage,
    SessionSettings,
};

/// Scribe - streaming edit engine harness
#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "SCRIBE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the maximum tool-continuation chain depth
    #[arg(long, value_name = "N")]
    max_chain_depth: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a captured SSE transcript through a session
    Replay {
        /// Transcript file
        file: PathBuf,

        /// Feed the transcript in fragments of this many characters
        #[arg(long, value_name = "CHARS")]
        chunk: Option<usize>,

        /// Prompt recorded as the turn's trigger
        #[arg(long, default_value = "replay")]
        prompt: String,
    },

    /// Compute the playback plan from one file's content to another's
    Plan {
        /// File holding the current content
        current: PathBuf,

        /// File holding the target content
        target: PathBuf,

        /// Play the plan with configured timing instead of listing it
        #[arg(long)]
        play: bool,
    },

    /// Print the checkpoints and redo entries of a ledger
    Ledger {
        /// Ledger file (defaults to the configured or standard location)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scribe=info".parse()?)
                .add_directive("scribe_core=info".parse()?),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = load_config_from_path(args.config.clone().or_else(default_config_path))
        .context("Failed to load configuration")?;
    let mut overrides = ConfigOverrides::new();
    if let Some(depth) = args.max_chain_depth {
        overrides = overrides.with_max_chain_depth(depth);
    }
    overrides.apply(&mut config);
    info!(source = %config.source(), "configuration loaded");

    match args.command {
        Command::Replay {
            file,
            chunk,
            prompt,
        } => replay(&config, &file, chunk, prompt).await,
        Command::Plan {
            current,
            target,
            play,
        } => plan(&config, &current, &target, play).await,
        Command::Ledger { path } => {
            let path = path
                .or_else(|| config.checkpoints.ledger_path.clone())
                .or_else(default_ledger_path)
                .context("No ledger path given and no data directory available")?;
            ledger(&path).await
        }
    }
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json(message: &SessionMessage) -> Result<()> {
    println!("{}", serde_json::to_string(message)?);
    Ok(())
}

/// Split on char boundaries, `size` chars per fragment
fn fragments(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

async fn replay(
    config: &ScribeConfig,
    file: &Path,
    chunk: Option<usize>,
    prompt: String,
) -> Result<()> {
    let transcript = read(file).await?;
    let mut session = EditSession::new(SessionSettings::from(config));

    let mut opened = session.handle(SessionEvent::UserPrompt { prompt });
    let Some(SessionMessage::StreamRequested { turn, .. }) = opened.pop() else {
        anyhow::bail!("session did not request a stream");
    };

    let parts = match chunk {
        Some(size) => fragments(&transcript, size),
        None => vec![transcript],
    };
    info!(fragments = parts.len(), file = %file.display(), "replaying transcript");

    for text in parts {
        for message in session.handle(SessionEvent::Fragment {
            turn: turn.clone(),
            text,
        }) {
            print_json(&message)?;
        }
    }
    for message in session.handle(SessionEvent::StreamClosed { turn }) {
        print_json(&message)?;
    }
    Ok(())
}

async fn plan(config: &ScribeConfig, current: &Path, target: &Path, play: bool) -> Result<()> {
    let current = read(current).await?;
    let target = read(target).await?;

    if !play {
        let plan = build_plan(&current, &target, &config.playback);
        info!(snapshots = plan.len(), "plan computed");
        for (step, snapshot) in plan.snapshots().iter().enumerate() {
            println!("{}", serde_json::json!({ "step": step, "snapshot": snapshot }));
        }
        return Ok(());
    }

    let (frames_tx, mut frames) = mpsc::channel(64);
    let driver = PlaybackDriver::spawn(current, config.playback, frames_tx);
    if !driver.handle().retarget(target).await {
        anyhow::bail!("playback driver stopped before starting");
    }

    while let Some(frame) = frames.recv().await {
        println!(
            "{}",
            serde_json::json!({ "remaining": frame.remaining, "content": frame.content })
        );
        if frame.remaining == 0 {
            break;
        }
    }
    driver.shutdown().await;
    Ok(())
}

async fn ledger(path: &Path) -> Result<()> {
    let storage = JsonFileStorage::new(path);
    let ledger = storage
        .load()
        .await
        .with_context(|| format!("Failed to load ledger {}", path.display()))?;

    println!("checkpoints ({}):", ledger.checkpoints.len());
    for checkpoint in &ledger.checkpoints {
        let when = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(checkpoint.timestamp)
            .map_or_else(|| checkpoint.timestamp.to_string(), |t| t.to_rfc3339());
        println!(
            "  {}  {}  {}  {}",
            checkpoint.id, when, checkpoint.path, checkpoint.description
        );
    }

    println!("redo entries ({}):", ledger.redo_stack.len());
    for entry in &ledger.redo_stack {
        println!(
            "  {}  restores {} ({} checkpoints)",
            entry.id,
            entry.restored_from,
            entry.checkpoints.len()
        );
    }
    Ok(())
}
