//! Race Score Overlay
//!
//! Reads team-race result screens with a vision model and keeps a running
//! team-score ledger for a streaming overlay.

mod capture;
mod config;
mod error;
mod extraction;
mod history;
mod logging;
mod overlay;
mod paths;
mod scoring;
mod store;
mod vision;

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use log::info;

use crate::capture::{create_work_queue, run_capture_worker, CaptureContext, CaptureWorkItem};
use crate::config::{AppConfig, StoreKind};
use crate::error::ScoreError;
use crate::extraction::RecordOrigin;
use crate::overlay::{render_text, LedgerWatcher, OverlayStyle, OverlayTarget};
use crate::scoring::entry::parse_score;
use crate::scoring::{DiffEvent, Mutation, ScoreLedgerService, ScoringMode, TeamGrouping};
use crate::store::{FileLedgerStore, HttpLedgerStore, LedgerStore};
use crate::vision::response::parse_model_text;
use crate::vision::{build_extractor, Extraction};

#[derive(Parser)]
#[command(name = "race-score-overlay", version, about)]
struct Cli {
    /// Config file (defaults to config.json next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use this ledger file instead of the configured store
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Group players into teams by name prefix
    #[arg(long, global = true)]
    infer_teams: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current ledger
    Show,
    /// Add race points from a JSON file of result rows
    Race { file: PathBuf },
    /// Replace the ledger with the team totals in a JSON file
    Sync { file: PathBuf },
    /// Read screenshots with the vision model and apply them in order
    Capture {
        #[arg(long, value_enum, default_value_t = ScoringMode::Race)]
        mode: ScoringMode,
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Clear every team
    Reset,
    /// Mark a team as the local player's
    Current { team: String },
    /// Rename the team at a position (1-based)
    Rename { index: usize, name: String },
    /// Overwrite the score of the team at a position (1-based)
    SetScore {
        index: usize,
        #[arg(allow_hyphen_values = true)]
        score: String,
    },
    /// Remove the team at a position (1-based)
    Remove { index: usize },
    /// Add a team
    Add {
        name: String,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        score: i64,
        #[arg(long)]
        current: bool,
    },
    /// Follow the store and print changes as they happen
    Watch,
}

fn main() -> Result<()> {
    logging::install_panic_hook();
    let cli = Cli::parse();

    paths::ensure_directories().context("Failed to create output directories")?;
    logging::init();

    let config = config::init_config(cli.config.as_deref());
    logging::set_level(logging::parse_level(config.log_level.as_deref()));

    let grouping = TeamGrouping::from_infer_flag(cli.infer_teams || config.infer_teams);
    let store = open_store(config, cli.ledger.as_deref())?;

    let result = run(cli.command, config, store, grouping);
    if let Err(e) = &result {
        log::error!("{:#}", e);
    }
    result
}

fn run(
    command: Command,
    config: &AppConfig,
    store: Box<dyn LedgerStore>,
    grouping: TeamGrouping,
) -> Result<()> {
    if matches!(command, Command::Watch) {
        return watch(store, config);
    }

    let service = Arc::new(ScoreLedgerService::open(store)?);
    let overlay = OverlayTarget::from_config(&config.overlay);

    let (mutation, batch_mode) = match command {
        Command::Show => {
            let ledger = service.ledger();
            info!("{} teams in {}", ledger.len(), service.store().describe());
            if ledger.is_empty() {
                println!("No teams yet.");
                return Ok(());
            }
            if let Some(current) = ledger.current_player() {
                info!("Current player's team: {}", current.team);
            }
            print!("{}", render_text(ledger.entries(), &overlay.style));
            return Ok(());
        }
        Command::Race { file } => (
            apply_file(&service, &file, ScoringMode::Race, grouping)?,
            Some(ScoringMode::Race),
        ),
        Command::Sync { file } => (
            apply_file(&service, &file, ScoringMode::Overall, grouping)?,
            Some(ScoringMode::Overall),
        ),
        Command::Capture { mode, images } => {
            capture(Arc::clone(&service), config, overlay.clone(), grouping, mode, images)?;
            print!("{}", render_text(&service.snapshot(), &overlay.style));
            return Ok(());
        }
        Command::Reset => (service.reset_ledger()?, None),
        Command::Current { team } => (service.set_current_player(&team)?, None),
        Command::Rename { index, name } => (service.rename_team(to_index(index)?, &name)?, None),
        Command::SetScore { index, score } => {
            let score = parse_score(&score)?;
            (service.set_score(to_index(index)?, score)?, None)
        }
        Command::Remove { index } => (service.remove_team(to_index(index)?)?, None),
        Command::Add {
            name,
            score,
            current,
        } => (service.add_team(&name, score, current)?, None),
        Command::Watch => return Ok(()),
    };

    if let Some(mode) = batch_mode {
        let history_path = config.history_path();
        history::init_history(&history_path)?;
        history::append_batch(&history_path, mode, &mutation, Local::now())?;
    }
    overlay.publish(mutation.next.entries())?;
    report(&mutation, &overlay.style);
    Ok(())
}

fn open_store(config: &AppConfig, ledger: Option<&Path>) -> Result<Box<dyn LedgerStore>> {
    if let Some(path) = ledger {
        return Ok(Box::new(FileLedgerStore::new(path)));
    }
    Ok(match config.store.kind {
        StoreKind::File => Box::new(FileLedgerStore::new(config.store.ledger_path())),
        StoreKind::Http => Box::new(
            HttpLedgerStore::new(
                &config.store.base_url,
                Duration::from_secs(config.store.timeout_secs),
            )
            .context("Failed to set up the ledger server client")?,
        ),
    })
}

/// Converts a 1-based command-line position.
fn to_index(position: usize) -> Result<usize, ScoreError> {
    position
        .checked_sub(1)
        .ok_or_else(|| ScoreError::InvalidTeamKey("position 0 (positions start at 1)".to_string()))
}

fn apply_file<S: LedgerStore>(
    service: &ScoreLedgerService<S>,
    file: &Path,
    mode: ScoringMode,
    grouping: TeamGrouping,
) -> Result<Mutation> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let rows = match parse_model_text(&text) {
        Extraction::Records(rows) => rows,
        Extraction::Failed(reason) => bail!("{}: {}", file.display(), reason),
    };
    Ok(service.apply_mode(&rows, mode, RecordOrigin::Manual, grouping)?)
}

fn capture<S: LedgerStore + 'static>(
    service: Arc<ScoreLedgerService<S>>,
    config: &AppConfig,
    overlay: OverlayTarget,
    grouping: TeamGrouping,
    mode: ScoringMode,
    images: Vec<PathBuf>,
) -> Result<()> {
    let extractor = build_extractor(&config.vision, grouping == TeamGrouping::InferFromNames)?;
    let history_path = config.history_path();
    history::init_history(&history_path)?;

    let ctx = CaptureContext {
        service,
        extractor,
        grouping,
        max_image_side: config.vision.max_image_side,
        history_path: Some(history_path),
        overlay: Some(overlay),
    };

    let (sender, receiver) = create_work_queue();
    let worker = thread::Builder::new()
        .name("capture-worker".to_string())
        .spawn(move || run_capture_worker(receiver, ctx))
        .context("Failed to start capture worker")?;

    for image in images {
        sender
            .send(CaptureWorkItem::new(image, mode))
            .map_err(|_| anyhow!("Capture worker stopped early"))?;
    }
    drop(sender);

    let summary = worker
        .join()
        .map_err(|_| anyhow!("Capture worker panicked"))?;
    if summary.applied == 0 {
        bail!(
            "No screenshot was applied ({} skipped, {} failed)",
            summary.skipped,
            summary.failed
        );
    }
    Ok(())
}

fn watch(store: Box<dyn LedgerStore>, config: &AppConfig) -> Result<()> {
    let overlay = OverlayTarget::from_config(&config.overlay);
    let interval = Duration::from_millis(config.overlay.poll_interval_ms.max(100));
    info!(
        "Watching {} every {} ms, writing {}",
        store.describe(),
        interval.as_millis(),
        overlay.path.display()
    );

    let stop = AtomicBool::new(false);
    let mut watcher = LedgerWatcher::new(store);
    watcher.run(interval, &stop, |update| {
        if let Err(e) = overlay.publish(&update.entries) {
            log::warn!("{:#}", e);
        }
        print_events(&update.events);
    });
    Ok(())
}

fn report(mutation: &Mutation, style: &OverlayStyle) {
    print!("{}", render_text(mutation.next.entries(), style));
    print_events(&mutation.events);
}

/// One JSON object per line, for animation drivers.
fn print_events(events: &[DiffEvent]) {
    for event in events {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => log::warn!("Failed to encode change event: {}", e),
        }
    }
}
