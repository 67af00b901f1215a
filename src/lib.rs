//! Emotion Sentinel Agent - Real-time facial-emotion session monitor.
//!
//! This library captures camera frames, classifies the emotion of every
//! visible face, and aggregates the per-frame labels into contiguous
//! emotion periods, raising a warning when negative affect is sustained.
//!
//! # Data Handling
//!
//! - **No frame storage**: Only the most recent annotated frame is kept
//! - **No recording**: Frames are never written to a video file
//! - **Timing only exports**: Session exports contain period timing and
//!   the assessment, never image data
//! - **Local processing**: Detection and classification run in-process
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Emotion Sentinel Agent                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//! │  │  Camera  │──▶│  Detect  │──▶│ Classify │──▶│ Annotate │  │
//! │  └──────────┘   └──────────┘   └──────────┘   └─────┬────┘  │
//! │                       capture thread                │       │
//! │         ┌───────────────────────┬──────────────────┘       │
//! │         ▼                       ▼                          │
//! │  ┌──────────────┐   ┌───────────────────┐                  │
//! │  │   Periods    │   │ latest-frame lane │                  │
//! │  │ (run-length) │   │   (depth 1)       │                  │
//! │  └──────┬───────┘   └─────────┬─────────┘                  │
//! │         ▼                     ▼         display thread     │
//! │  ┌──────────────┐   ┌───────────────────┐                  │
//! │  │  Evaluator   │   │  Display Poller   │──▶ sink/viewer   │
//! │  └──────────────┘   └───────────────────┘                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! use emotion_sentinel_agent::capture::{CaptureWorker, WorkerSettings};
//! use emotion_sentinel_agent::poller::{DisplayPoller, PollerSettings, SnapshotSink};
//! use emotion_sentinel_agent::stats::create_shared_stats;
//! use emotion_sentinel_agent::synthetic::SyntheticStageFactory;
//! use emotion_sentinel_agent::transport;
//!
//! let (publisher, receiver) = transport::channel();
//! let worker = CaptureWorker::new(
//!     Arc::new(SyntheticStageFactory::new()),
//!     publisher,
//!     create_shared_stats(),
//!     WorkerSettings::default(),
//! );
//! let sink = SnapshotSink::new("latest.jpg".into());
//! let poller = DisplayPoller::new(worker, receiver, sink, PollerSettings::default());
//!
//! // Runs sessions until the flag goes false, then reports.
//! let running = Arc::new(AtomicBool::new(true));
//! for outcome in poller.run(running) {
//!     println!("{}", outcome.assessment.summary());
//! }
//! ```

pub mod camera;
pub mod capture;
pub mod config;
pub mod core;
pub mod poller;
pub mod stats;
pub mod synthetic;
pub mod transport;
pub mod vision;

#[cfg(feature = "viewer")]
pub mod viewer;

// Re-export key types at crate root for convenience
pub use camera::{CameraDevice, DeviceError, RawFrame};
pub use capture::{
    CaptureStages, CaptureWorker, MonitorState, SessionOutcome, StageFactory, Status,
    WorkerSettings,
};
pub use config::Config;
pub use core::{
    EmotionAggregator, Period, SessionAssessment, SessionEvaluator, SessionInfo, SessionVerdict,
};
pub use poller::{DisplayPoller, FrameSink, PollerSettings, SnapshotSink};
pub use stats::{PipelineStats, PipelineStatsSnapshot, SharedPipelineStats};
pub use transport::{FramePacket, FramePublisher, FrameReceiver, StopCause};
pub use vision::{EmotionLabel, FaceObservation, FrameInfo};

// Viewer re-exports (when enabled)
#[cfg(feature = "viewer")]
pub use viewer::{ViewerConfig, ViewerShared, ViewerSink};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Data handling declaration that can be displayed to users.
pub const DATA_HANDLING_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║          EMOTION SENTINEL AGENT - DATA HANDLING NOTICE           ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This agent monitors facial emotion during a camera session.     ║
║                                                                  ║
║  ✓ WHAT WE KEEP:                                                 ║
║    • When each emotion started and ended (timing only)           ║
║    • The most recent annotated frame, in memory                  ║
║    • Aggregate counters (frames, faces, warnings)                ║
║                                                                  ║
║  ✗ WHAT WE NEVER KEEP:                                           ║
║    • Video recordings of any kind                                ║
║    • Frame history (each frame overwrites the last)              ║
║    • Image data in session exports                               ║
║                                                                  ║
║  All processing happens locally. The viewer binds to the         ║
║  loopback interface only.                                        ║
║                                                                  ║
║  You can view pipeline statistics anytime with:                  ║
║    emotion-sentinel status                                       ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
