use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use recording_timeline::core::config::{Config, PollingConfig};
use recording_timeline::core::describe::Locale;
use recording_timeline::core::recording::Recording;
use recording_timeline::core::source::{load_snapshot, RecordingSource, SnapshotDir};
use recording_timeline::core::timeline::Timeline;
use recording_timeline::core::watcher::{TimelineUpdate, TimelineWatcher};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "RECORDING_TIMELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Language for stage descriptions (en, pt)
    #[arg(long, global = true)]
    locale: Option<Locale>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the processing timeline of one recording snapshot
    Show {
        file: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print one status line per recording in a snapshot directory
    List { dir: PathBuf },

    /// Poll a snapshot directory and print timelines as they change
    Watch {
        dir: PathBuf,

        /// Seconds between polls
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after N polls
        #[arg(long)]
        max_polls: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("recording_timeline={}", config.logging.level).into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let locale = args.locale.unwrap_or(config.display.locale);

    match args.command {
        Command::Show { file, json } => show(&file, json, locale, &config),
        Command::List { dir } => list(dir, locale),
        Command::Watch {
            dir,
            interval,
            max_polls,
        } => {
            let mut polling = config.polling.clone();
            if let Some(seconds) = interval {
                polling.interval_seconds = seconds;
            }
            if max_polls.is_some() {
                polling.max_polls = max_polls;
            }
            watch(dir, &polling, locale, &config).await
        }
    }
}

fn show(file: &Path, json: bool, locale: Locale, config: &Config) -> Result<()> {
    let recording = load_snapshot(file)
        .with_context(|| format!("Failed to load recording from {:?}", file))?;
    log_anomalies(&recording);

    let timeline = Timeline::resolve(&recording, locale);
    if json {
        println!("{}", serde_json::to_string_pretty(&timeline)?);
    } else {
        print_timeline(&timeline, config);
    }
    Ok(())
}

fn list(dir: PathBuf, locale: Locale) -> Result<()> {
    let source = SnapshotDir::new(dir);
    let recordings = source
        .list()
        .with_context(|| format!("Failed to read snapshots from {:?}", source.root()))?;

    if recordings.is_empty() {
        warn!("No recording snapshots found");
        return Ok(());
    }

    for recording in &recordings {
        let timeline = Timeline::resolve(recording, locale);
        println!(
            "{:<24} {:<12} {:>4.0}%  {}",
            timeline.recording_id.as_deref().unwrap_or("-"),
            recording.status.as_str(),
            timeline.progress() * 100.0,
            timeline.banner.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn watch(
    dir: PathBuf,
    polling: &PollingConfig,
    locale: Locale,
    config: &Config,
) -> Result<()> {
    let source = Arc::new(SnapshotDir::new(dir));
    let watcher = TimelineWatcher::new(source, polling, locale);
    let (mut updates, handle) = watcher.spawn()?;

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(TimelineUpdate::Changed(timeline)) => {
                    print_timeline(&timeline, config);
                    println!();
                }
                Some(TimelineUpdate::Removed { recording_id }) => {
                    println!("{} removed\n", recording_id);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watcher");
                watcher.stop();
                break;
            }
        }
    }

    drop(updates);
    handle.await.context("Watcher task panicked")?;
    Ok(())
}

fn print_timeline(timeline: &Timeline, config: &Config) {
    println!("{}", timeline);
    if config.display.show_progress {
        println!("  {:.0}% complete", timeline.progress() * 100.0);
    }
}

fn log_anomalies(recording: &Recording) {
    let id = recording.id.as_deref().unwrap_or("-");
    for anomaly in recording.anomalies() {
        warn!("Recording {}: {}", id, anomaly);
    }
}
