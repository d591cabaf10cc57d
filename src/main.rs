use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use driftwall::replay::{self, Trace};
use driftwall::{Engine, EngineConfig, EntryFeed, EntryId, Frame, Vec2};
use tracing_subscriber::EnvFilter;

/// Lay out and replay a wall of entries on a wrap-around plane.
#[derive(Parser)]
#[command(name = "driftwall")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Screen width in pixels
    #[arg(long, global = true, default_value = "1280")]
    width: f32,

    /// Screen height in pixels
    #[arg(long, global = true, default_value = "800")]
    height: f32,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one render frame for a viewport position
    Layout {
        /// Entry feed (.json, .yaml, .yml)
        #[arg(short, long)]
        entries: PathBuf,

        /// Id of the newest entry, pinned to the plane origin
        #[arg(long)]
        newest: Option<EntryId>,

        /// Engine configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Viewport offset along x
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        offset_x: f32,

        /// Viewport offset along y
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        offset_y: f32,
    },
    /// Replay a recorded input trace and print the settled frame
    Replay {
        /// Entry feed (.json, .yaml, .yml)
        #[arg(short, long)]
        entries: PathBuf,

        /// Input trace (.json, .yaml, .yml)
        #[arg(short, long)]
        trace: PathBuf,

        /// Engine configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print every frame as one JSON line instead of only the last
        #[arg(long)]
        every_frame: bool,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_feed(path: &Path) -> anyhow::Result<EntryFeed> {
    EntryFeed::load(path).with_context(|| format!("failed to load entries {}", path.display()))
}

fn print_frame(frame: &Frame) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(frame)?);
    Ok(())
}

fn render_layout(
    cli: &Cli,
    entries: &Path,
    newest: Option<EntryId>,
    config: Option<&Path>,
    offset: Vec2,
) -> anyhow::Result<()> {
    let mut feed = load_feed(entries)?;
    if newest.is_some() {
        feed = feed.with_newest(newest);
    }

    let mut engine = Engine::new(load_config(config)?, cli.width, cli.height)?;
    engine.sync(&feed);
    engine.place(offset);
    print_frame(&engine.frame(0.0))
}

fn replay_trace(
    cli: &Cli,
    entries: &Path,
    trace: &Path,
    config: Option<&Path>,
    every_frame: bool,
) -> anyhow::Result<()> {
    let feed = load_feed(entries)?;
    let trace =
        Trace::load(trace).with_context(|| format!("failed to load trace {}", trace.display()))?;
    let mut engine = Engine::new(load_config(config)?, cli.width, cli.height)?;

    let mut printed = 0usize;
    let mut failed = None;
    let last = replay::replay(&mut engine, feed, &trace, |frame| {
        if every_frame && failed.is_none() {
            match serde_json::to_string(frame) {
                Ok(line) => {
                    println!("{line}");
                    printed += 1;
                }
                Err(e) => failed = Some(e),
            }
        }
    });
    if let Some(e) = failed {
        return Err(e.into());
    }

    match (every_frame, printed) {
        (true, 0) => {
            println!("{}", serde_json::to_string(&last)?);
            Ok(())
        }
        (true, _) => Ok(()),
        (false, _) => print_frame(&last),
    }
}

fn main() -> anyhow::Result<()> {
    // stdout carries frames; logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .try_init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Layout {
            entries,
            newest,
            config,
            offset_x,
            offset_y,
        } => render_layout(
            &cli,
            entries,
            *newest,
            config.as_deref(),
            Vec2::new(*offset_x, *offset_y),
        ),
        Commands::Replay {
            entries,
            trace,
            config,
            every_frame,
        } => replay_trace(&cli, entries, trace, config.as_deref(), *every_frame),
    }
}
