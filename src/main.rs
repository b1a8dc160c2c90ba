use anyhow::Context;
use clap::Parser;
use image::ImageReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use plategate::config::{Overrides, Settings};
use plategate::core::{EventLog, EventSummary, Gate, Notifier, Published};
use plategate::{DebugConfig, OcrsRecognizer, PlateLocalizer};

#[derive(Parser)]
#[command(name = "plategate")]
#[command(about = "Read license plates from images and decide whether to grant access")]
struct Cli {
    /// Images to process, in order
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Authorized plate (repeatable, or comma separated)
    #[arg(short, long, value_name = "PLATE")]
    authorized: Vec<String>,

    /// OCR text detection model (.rten)
    #[arg(long, value_name = "FILE")]
    detection_model: Option<PathBuf>,

    /// OCR text recognition model (.rten)
    #[arg(long, value_name = "FILE")]
    recognition_model: Option<PathBuf>,

    /// MQTT broker host; enables notifications
    #[arg(long)]
    mqtt_host: Option<String>,

    /// MQTT broker port
    #[arg(long)]
    mqtt_port: Option<u16>,

    /// MQTT topic for decision events
    #[arg(long)]
    mqtt_topic: Option<String>,

    /// Seconds a single notification may take before it is abandoned
    #[arg(long, value_name = "SECS")]
    notify_timeout: Option<u64>,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Only locate plates; no OCR, no decisions
    #[arg(long)]
    skip_ocr: bool,

    /// Print the session log as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            authorized: self.authorized.clone(),
            detection_model: self.detection_model.clone(),
            recognition_model: self.recognition_model.clone(),
            mqtt_host: self.mqtt_host.clone(),
            mqtt_port: self.mqtt_port,
            mqtt_topic: self.mqtt_topic.clone(),
            notify_timeout: self.notify_timeout.map(Duration::from_secs),
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_image(path: &Path) -> anyhow::Result<image::DynamicImage> {
    ImageReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))
}

/// Per-input debug directory, named after the input's position and file stem
fn debug_for(debug: &Option<DebugConfig>, idx: usize, path: &Path) -> Option<DebugConfig> {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    debug.as_ref().map(|d| d.for_input(&format!("{:02}_{}", idx + 1, stem)))
}

fn run_localization_only(cli: &Cli, debug: &Option<DebugConfig>) -> anyhow::Result<()> {
    let localizer = PlateLocalizer::new();
    for (idx, path) in cli.images.iter().enumerate() {
        let img = match load_image(path) {
            Ok(img) => img,
            Err(e) => {
                eprintln!("{}: {:#}", path.display(), e);
                continue;
            }
        };
        match localizer.localize_with_debug(&img, debug_for(debug, idx, path)) {
            Ok(Some(plate)) => {
                let r = plate.region;
                println!(
                    "{}: plate at ({}, {}) {}x{}, contour #{} by area ({:.0} px)",
                    path.display(),
                    r.x,
                    r.y,
                    r.width,
                    r.height,
                    plate.rank + 1,
                    plate.contour_area
                );
            }
            Ok(None) => println!("{}: no plate found", path.display()),
            Err(e) => eprintln!("{}: {}", path.display(), e),
        }
    }
    Ok(())
}

fn print_report(log: &EventLog, json: bool) -> anyhow::Result<()> {
    let records = log.snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let summary = EventSummary::from_records(&records);
    println!("\n=== Access Log ===");
    println!(
        "Total: {}  Authorized: {}  Denied: {}  Not found: {}",
        summary.total, summary.authorized, summary.denied, summary.not_found
    );
    for record in &records {
        println!("  {}  {:<12} {}", record.timestamp, record.plate, record.decision);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let debug = cli.debug_out.clone().map(DebugConfig::new).transpose()?;

    if cli.skip_ocr {
        return run_localization_only(&cli, &debug);
    }

    let settings = Settings::load(cli.config.as_deref(), &cli.overrides())?;
    tracing::info!(
        authorized = settings.authorized.len(),
        notify = settings.notify.is_some(),
        "configuration loaded"
    );

    let log = Arc::new(EventLog::new());
    let gate = Gate::new(
        OcrsRecognizer::new(settings.ocr_models),
        settings.authorized,
        log.clone(),
        Notifier::from_config(settings.notify),
    );

    for (idx, path) in cli.images.iter().enumerate() {
        let img = match load_image(path) {
            Ok(img) => img,
            Err(e) => {
                eprintln!("{}: {:#}", path.display(), e);
                continue;
            }
        };

        match gate.handle(&img, debug_for(&debug, idx, path)).await {
            Ok(outcome) => {
                println!("{}: {} ({})", path.display(), outcome.decision(), outcome.record.plate);
                match &outcome.notification {
                    Ok(Published::Sent { topic, bytes }) => {
                        tracing::debug!(topic = %topic, bytes, "decision published")
                    }
                    Ok(Published::Skipped) => {}
                    Err(e) => eprintln!("{}: notification failed: {}", path.display(), e),
                }
            }
            Err(e) => eprintln!("{}: {}", path.display(), e),
        }
    }

    print_report(&log, cli.json)
}
