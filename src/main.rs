//! Emotion Sentinel Agent CLI
//!
//! Real-time facial-emotion session monitor.

use chrono::Utc;
use clap::{Parser, Subcommand};
use emotion_sentinel_agent::{
    capture::{CaptureWorker, WorkerSettings},
    config::Config,
    core::AggregatorSettings,
    poller::{DisplayPoller, FrameSink, SnapshotSink},
    stats::create_shared_stats_with_persistence,
    synthetic::SyntheticStageFactory,
    transport,
    vision::EmotionLabel,
    SessionOutcome, DATA_HANDLING_DECLARATION, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[cfg(feature = "viewer")]
use emotion_sentinel_agent::viewer::{self, ViewerConfig, ViewerShared, ViewerSink};

#[derive(Parser)]
#[command(name = "emotion-sentinel")]
#[command(version = VERSION)]
#[command(about = "Real-time facial-emotion session monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a monitoring session
    Start {
        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Capture frames as-is instead of mirroring them
        #[arg(long)]
        no_mirror: bool,

        /// Sustained-negative warning threshold in milliseconds
        #[arg(long)]
        threshold: Option<i64>,

        /// Serve the latest frame over a local HTTP viewer (requires viewer feature)
        #[arg(long)]
        viewer: bool,

        /// Viewer port (overrides the configured port)
        #[arg(long)]
        viewer_port: Option<u16>,
    },

    /// Show cumulative pipeline statistics
    Status,

    /// Print an exported session report
    Report {
        /// Path to a session export file
        file: PathBuf,
    },

    /// List emotion labels with their display colors
    Labels,

    /// Display data handling notice
    Notice,

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            duration,
            no_mirror,
            threshold,
            viewer,
            viewer_port,
        } => {
            cmd_start(duration, no_mirror, threshold, viewer, viewer_port);
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Report { file } => {
            cmd_report(&file);
        }
        Commands::Labels => {
            cmd_labels();
        }
        Commands::Notice => {
            cmd_notice();
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

#[allow(unused_variables)]
fn cmd_start(
    duration: Option<u64>,
    no_mirror: bool,
    threshold: Option<i64>,
    enable_viewer: bool,
    viewer_port: Option<u16>,
) {
    println!("Emotion Sentinel Agent v{VERSION}");
    println!();

    // Load or create configuration
    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let mut settings = WorkerSettings {
        capture: config.capture.clone(),
        aggregator: config.aggregator.clone(),
        evaluator: config.evaluator.clone(),
    };
    if no_mirror {
        settings.capture.mirror = false;
    }
    if let Some(ms) = threshold {
        settings.aggregator.warning_threshold_ms = ms;
    }

    println!("Starting session...");
    println!("  Source: synthetic (scripted)");
    println!(
        "  Mirror: {}",
        if settings.capture.mirror {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  Published frame: {}x{} (JPEG quality {})",
        settings.capture.publish_width,
        settings.capture.publish_height,
        settings.capture.jpeg_quality
    );
    println!(
        "  Warning threshold: {} ms",
        settings.aggregator.warning_threshold_ms
    );
    println!("  Poll interval: {} ms", config.poller.poll_interval_ms);
    if let Some(secs) = duration {
        println!("  Duration: {secs}s");
    }

    // Show viewer status
    #[cfg(feature = "viewer")]
    let viewer_shared: Option<Arc<ViewerShared>> = if enable_viewer {
        let port = viewer_port.unwrap_or(config.viewer_port);
        let shared = Arc::new(ViewerShared::new());
        spawn_viewer(port, Arc::clone(&shared));
        println!("  Viewer: http://127.0.0.1:{port}/frame");
        Some(shared)
    } else {
        println!("  Viewer: disabled");
        None
    };

    #[cfg(not(feature = "viewer"))]
    if enable_viewer {
        eprintln!("Warning: --viewer flag ignored (viewer feature not enabled at compile time)");
    }

    let snapshot_path = config.data_path.join("latest_frame.jpg");

    #[cfg(feature = "viewer")]
    let use_snapshot = viewer_shared.is_none();
    #[cfg(not(feature = "viewer"))]
    let use_snapshot = true;

    if use_snapshot {
        println!("  Latest frame: {snapshot_path:?}");
    }

    println!();
    println!("Press Ctrl+C to stop");
    println!();

    // Set up pipeline stats
    let stats = create_shared_stats_with_persistence(config.data_path.join("stats.json"));

    // Create the capture worker
    let (publisher, receiver) = transport::channel();
    let factory = Arc::new(
        SyntheticStageFactory::new()
            .with_timeline(session_timeline())
            .with_hold(50)
            .cycling(),
    );
    let worker = CaptureWorker::new(factory, publisher, Arc::clone(&stats), settings);
    println!("Device ID: {}", worker.device());

    #[cfg(feature = "viewer")]
    let sink: Box<dyn FrameSink> = match viewer_shared {
        Some(shared) => Box::new(ViewerSink::new(shared)),
        None => Box::new(SnapshotSink::new(snapshot_path)),
    };

    #[cfg(not(feature = "viewer"))]
    let sink: Box<dyn FrameSink> = Box::new(SnapshotSink::new(snapshot_path));

    let poller = DisplayPoller::new(worker, receiver, sink, config.poller.clone());

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc_handler(r);

    if let Some(secs) = duration {
        let r = running.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            r.store(false, Ordering::SeqCst);
        });
    }

    // Drive the consumer loop until stopped
    let outcomes = poller.run(running);

    if outcomes.is_empty() {
        println!();
        println!("No session completed.");
    }

    for outcome in &outcomes {
        print_outcome(outcome);
    }

    // Export session reports
    if !outcomes.is_empty() {
        let export_path = config.export_path.join(format!(
            "session_{}.json",
            Utc::now().format("%Y%m%d_%H%M%S")
        ));

        if let Some(parent) = export_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match serde_json::to_string_pretty(&outcomes) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&export_path, json) {
                    eprintln!("Error writing session report: {e}");
                } else {
                    println!(
                        "Exported {} session(s) to {:?}",
                        outcomes.len(),
                        export_path
                    );
                }
            }
            Err(e) => {
                eprintln!("Error serializing session report: {e}");
            }
        }
    }

    // Save pipeline stats
    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save statistics: {e}");
    }

    // Final stats
    println!();
    println!("{}", stats.summary());
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Emotion Sentinel Agent Status");
    println!("=============================");
    println!();

    // Show config
    println!("Configuration:");
    println!(
        "  Mirror: {}",
        if config.capture.mirror {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  Published frame: {}x{}",
        config.capture.publish_width, config.capture.publish_height
    );
    println!(
        "  Warning threshold: {} ms",
        config.aggregator.warning_threshold_ms
    );
    println!("  Poll interval: {} ms", config.poller.poll_interval_ms);
    println!("  Auto restart: {}", config.poller.auto_restart);
    println!();

    // Load and show pipeline stats if available
    let stats_path = config.data_path.join("stats.json");
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                if let Some(v) = stats.get("frames_captured") {
                    println!("  Frames captured: {v}");
                }
                if let Some(v) = stats.get("frames_published") {
                    println!("  Frames published: {v}");
                }
                if let Some(v) = stats.get("frames_dropped") {
                    println!("  Frames dropped: {v}");
                }
                if let Some(v) = stats.get("faces_detected") {
                    println!("  Faces detected: {v}");
                }
                if let Some(v) = stats.get("warnings_raised") {
                    println!("  Warnings raised: {v}");
                }
                if let Some(v) = stats.get("sessions_completed") {
                    println!("  Sessions completed: {v}");
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_report(file: &Path) {
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {file:?}: {e}");
            std::process::exit(1);
        }
    };

    let outcomes: Vec<SessionOutcome> = match serde_json::from_str(&content) {
        Ok(outcomes) => outcomes,
        Err(e) => {
            eprintln!("Error parsing {file:?}: {e}");
            std::process::exit(1);
        }
    };

    println!("{} session(s) in {:?}", outcomes.len(), file);
    for outcome in &outcomes {
        print_outcome(outcome);
    }
}

fn cmd_labels() {
    let defaults = AggregatorSettings::default();

    println!("Emotion Labels");
    println!("==============");
    println!();
    for label in EmotionLabel::ALL {
        let mark = if defaults.is_negative(label) {
            "  negative"
        } else {
            ""
        };
        println!(
            "  {}  {:<18} {}{}",
            label.index(),
            label.as_str(),
            label.color_hex(),
            mark
        );
    }
}

fn cmd_notice() {
    println!("{DATA_HANDLING_DECLARATION}");
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Print one session's period breakdown and assessment.
fn print_outcome(outcome: &SessionOutcome) {
    println!();
    println!(
        "Session {} on {} ({})",
        outcome.session.session_id, outcome.device, outcome.cause
    );

    for label in EmotionLabel::ALL {
        let periods = outcome.session.periods_for(label);
        if periods.is_empty() {
            continue;
        }
        println!(
            "==== {} ==== periods: {}, total: {} ms",
            label,
            periods.len(),
            outcome.session.total_duration_ms(label)
        );
        for period in periods {
            println!(
                "  {} -> {}  ({} ms)",
                period.start.format("%H:%M:%S%.3f"),
                period.end.format("%H:%M:%S%.3f"),
                period.duration_ms()
            );
        }
    }

    println!();
    println!("{}", outcome.assessment.summary());
}

/// Label arc the synthetic source plays through during `start`.
///
/// The Sad/Angry stretch is long enough to cross the default warning
/// threshold once per cycle.
fn session_timeline() -> Vec<EmotionLabel> {
    vec![
        EmotionLabel::Neutral,
        EmotionLabel::Happy,
        EmotionLabel::Neutral,
        EmotionLabel::Sad,
        EmotionLabel::Angry,
        EmotionLabel::Neutral,
        EmotionLabel::Surprised,
    ]
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}

/// Serve the viewer from a background thread with its own runtime.
#[cfg(feature = "viewer")]
fn spawn_viewer(port: u16, shared: Arc<ViewerShared>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                eprintln!("Warning: Could not start viewer runtime: {e}");
                return;
            }
        };

        runtime.block_on(async move {
            match viewer::run(ViewerConfig::new(port), shared).await {
                Ok((_addr, _shutdown)) => {
                    // The shutdown handle must outlive the server future.
                    std::future::pending::<()>().await;
                }
                Err(e) => {
                    eprintln!("Warning: Viewer failed to start: {e}");
                }
            }
        });
    });
}
