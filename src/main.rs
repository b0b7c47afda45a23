//! SDVX Result OCR
//!
//! Reads Sound Voltex result screenshots: crops the regions an external
//! detector found, stacks them into one labelled image, sends it to a
//! general OCR service and turns the reply into a score record.

mod composite;
mod config;
mod detection;
mod error;
mod ocr;
mod paths;
mod pipeline;
mod records;
mod songs;
mod upload;
mod worker;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::composite::LabelStyle;
use crate::config::{get_config, AppConfig};
use crate::detection::DetectionFile;
use crate::ocr::{GeneralOcrClient, StructuredRecord, Vocabulary};
use crate::pipeline::PipelineContext;
use crate::records::{RecordStore, ScoreRecord};
use crate::songs::SongCatalog;
use crate::worker::{
    create_outcome_queue, create_work_queue, start_workers, UploadItem, UploadOutcome,
};

/// Screenshot types picked up by `batch`.
const BATCH_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

#[derive(Parser)]
#[command(name = "sdvx-result-ocr", version, about = "Reads SDVX result screenshots into score records")]
struct Cli {
    /// Log level or flexi_logger spec, e.g. `debug` or `info, sdvx_result_ocr::ocr=debug`
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process one screenshot
    Upload {
        image: PathBuf,
        /// Detector output; defaults to `<image stem>.json` next to the image
        #[arg(long)]
        detections: Option<PathBuf>,
        /// Store the records under this user
        #[arg(long)]
        user: Option<String>,
    },
    /// Process every screenshot in a directory that has detections beside it
    Batch {
        dir: PathBuf,
        #[arg(long)]
        user: Option<String>,
    },
    /// List a user's stored records, best first
    Records { user: String },
    /// Show catalog information for a song
    Song {
        title: String,
        /// Print the path of the song's thumbnail for this difficulty instead
        #[arg(long, value_name = "DIFFICULTY")]
        thumbnail: Option<String>,
    },
}

/// Starts the logger: rotating files under `logs/`, everything echoed to
/// stdout, warnings and errors to stderr.
fn setup_logging(level: &str) -> Result<LoggerHandle> {
    let handle = Logger::try_with_str(level)
        .context("Invalid log level")?
        .log_to_file(
            FileSpec::default()
                .directory(paths::get_logs_dir())
                .basename("sdvx_result_ocr"),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .duplicate_to_stdout(Duplicate::All)
        .rotate(
            Criterion::Size(1024 * 1024), //1MB
            Naming::Timestamps,
            Cleanup::KeepLogFiles(5),
        )
        .start()
        .context("Logger initialization failed")?;
    Ok(handle)
}

/// Routes panics through the logger before the default hook prints them.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        log::error!("[PANIC]{} {}", location, msg);
        default_hook(panic_info);
    }));
}

fn load_vocabulary(config: &AppConfig) -> (SongCatalog, Arc<Vocabulary>) {
    let catalog = SongCatalog::load_or_empty(&paths::resolve(&config.song_catalog));
    let vocabulary = Arc::new(Vocabulary::new(catalog.titles()));
    (catalog, vocabulary)
}

fn build_context(config: &AppConfig) -> Result<PipelineContext> {
    let style = LabelStyle::from_config(config)?;
    let (_, vocabulary) = load_vocabulary(config);
    let client = GeneralOcrClient::new(config, Some(paths::get_ocr_json_dir()))?;

    Ok(PipelineContext {
        vocabulary,
        ocr: Arc::new(client),
        style: Arc::new(style),
        min_detected_classes: config.min_detected_classes,
        ocr_ready_dir: Some(paths::get_ocr_ready_dir()),
    })
}

fn record_store(config: &AppConfig) -> RecordStore {
    RecordStore::new(paths::resolve(&config.records_file))
}

/// Stores recognized records under `user`, if one was given. Records with
/// no recognized field are skipped. Returns how many were saved.
fn persist(store: &RecordStore, user: Option<&str>, records: &[StructuredRecord]) -> Result<usize> {
    let Some(user) = user else {
        return Ok(0);
    };
    let now = Local::now();
    let mut saved = 0;
    for record in records {
        if record.is_empty() {
            log::warn!("Not saving an empty record for {}", user);
            continue;
        }
        store.append(&ScoreRecord::from_structured(record, user, now))?;
        saved += 1;
    }
    log::info!(
        "Saved {} record(s) for {} to {}",
        saved,
        user,
        store.path().display()
    );
    Ok(saved)
}

fn run_upload(
    config: &AppConfig,
    image: &Path,
    detections: Option<PathBuf>,
    user: Option<&str>,
) -> Result<()> {
    let ctx = build_context(config)?;
    let detector = match detections {
        Some(path) => DetectionFile::new(path),
        None => DetectionFile::beside(image),
    };

    let upload = upload::store_upload(image, &paths::get_uploads_dir())?;
    let records = ctx.process_upload(&upload, &detector)?;

    println!("{}", serde_json::to_string_pretty(&records)?);
    persist(&record_store(config), user, &records)?;
    Ok(())
}

/// Screenshots in `dir` with a `<stem>.json` detection file, sorted by name.
fn collect_batch(dir: &Path) -> Result<Vec<UploadItem>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| BATCH_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    images.sort();

    let mut items = Vec::new();
    for image_path in images {
        let detections_path = image_path.with_extension("json");
        if !detections_path.exists() {
            log::warn!("Skipping {}: no detections file", image_path.display());
            continue;
        }
        let sequence = items.len() as u32 + 1;
        items.push(UploadItem::new(image_path, detections_path, sequence));
    }
    Ok(items)
}

/// Summary entry for one batch item, persisting its records. The flag is
/// false when either the pipeline or saving failed.
fn batch_entry(
    store: &RecordStore,
    user: Option<&str>,
    outcome: UploadOutcome,
) -> (serde_json::Value, bool) {
    let image = outcome.item.image_path.display().to_string();
    let records = match outcome.result {
        Ok(records) => records,
        Err(e) => {
            let entry = serde_json::json!({
                "image": image,
                "upload": outcome.upload_name,
                "error": format!("{:#}", e),
            });
            return (entry, false);
        }
    };

    match persist(store, user, &records) {
        Ok(_) => {
            let entry = serde_json::json!({
                "image": image,
                "upload": outcome.upload_name,
                "records": records,
            });
            (entry, true)
        }
        Err(e) => {
            log::error!("Failed to save records for {}: {:#}", image, e);
            let entry = serde_json::json!({
                "image": image,
                "upload": outcome.upload_name,
                "records": records,
                "error": format!("{:#}", e),
            });
            (entry, false)
        }
    }
}

fn run_batch(config: &AppConfig, dir: &Path, user: Option<&str>) -> Result<()> {
    let items = collect_batch(dir)?;
    if items.is_empty() {
        return Err(anyhow!("No screenshots with detections in {}", dir.display()));
    }
    log::info!("Batch of {} screenshot(s) from {}", items.len(), dir.display());

    let ctx = Arc::new(build_context(config)?);
    let (sender, receiver) = create_work_queue();
    let (outcome_tx, outcome_rx) = create_outcome_queue();
    let handles = start_workers(
        config.worker_count,
        receiver,
        outcome_tx,
        ctx,
        paths::get_uploads_dir(),
    );

    let total = items.len();
    for item in items {
        sender.send(item).context("Upload workers stopped early")?;
    }
    drop(sender);

    let store = record_store(config);
    let mut failed = 0;
    let mut summary = Vec::with_capacity(total);
    for outcome in outcome_rx {
        let (entry, ok) = batch_entry(&store, user, outcome);
        if !ok {
            failed += 1;
        }
        summary.push(entry);
    }

    for handle in handles {
        if handle.join().is_err() {
            log::error!("An upload worker panicked");
        }
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    log::info!("Batch finished: {} of {} failed", failed, total);
    Ok(())
}

fn run_records(config: &AppConfig, user: &str) -> Result<()> {
    let records = record_store(config).for_user(user)?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn run_song(config: &AppConfig, title: &str, thumbnail: Option<&str>) -> Result<()> {
    if let Some(difficulty) = thumbnail {
        let path = songs::find_thumbnail(&paths::resolve(&config.thumbnail_dir), title, difficulty)?;
        println!("{}", path.display());
        return Ok(());
    }

    let (catalog, _) = load_vocabulary(config);
    let song = catalog
        .find(title)
        .ok_or_else(|| anyhow!("Song not found: {}", title))?;
    println!("{}", serde_json::to_string_pretty(song)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Ensure output directories exist before the logger opens its file
    paths::ensure_directories()?;
    let _logger = setup_logging(&cli.log_level)?;
    install_panic_hook();

    config::init_config();
    let config = get_config();

    let result = match &cli.command {
        Command::Upload {
            image,
            detections,
            user,
        } => run_upload(config, image, detections.clone(), user.as_deref()),
        Command::Batch { dir, user } => run_batch(config, dir, user.as_deref()),
        Command::Records { user } => run_records(config, user),
        Command::Song { title, thumbnail } => run_song(config, title, thumbnail.as_deref()),
    };

    if let Err(e) = &result {
        log::error!("{:#}", e);
    }
    result
}
