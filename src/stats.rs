//! Pipeline counters for the capture and display sides.
//!
//! Tracks how many frames and faces moved through the pipeline without
//! retaining any image content. Counters are lock-free so the capture
//! loop can record from its own thread while the CLI reads snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current agent run.
#[derive(Debug)]
pub struct PipelineStats {
    /// Frames read from the camera
    frames_captured: AtomicU64,
    /// Annotated frames handed to the transport
    frames_published: AtomicU64,
    /// Frames evicted because the consumer had not polled
    frames_dropped: AtomicU64,
    /// Face regions detected
    faces_detected: AtomicU64,
    /// Classifications that failed and degraded to no-face
    classifier_failures: AtomicU64,
    /// Sustained-negative warnings raised
    warnings_raised: AtomicU64,
    /// Capture sessions finalized
    sessions_completed: AtomicU64,
    /// Agent start time
    started_at: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl PipelineStats {
    /// Create fresh counters.
    pub fn new() -> Self {
        Self {
            frames_captured: AtomicU64::new(0),
            frames_published: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            faces_detected: AtomicU64::new(0),
            classifier_failures: AtomicU64::new(0),
            warnings_raised: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create counters that persist to `path`, seeded from an earlier run
    /// if one was saved there.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            eprintln!("Note: Could not load previous pipeline stats: {e}");
        }

        stats
    }

    pub fn record_frame_captured(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_published(&self) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_face_detected(&self) {
        self.faces_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_classifier_failure(&self) {
        self.classifier_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_warning_raised(&self) {
        self.warnings_raised.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_completed(&self) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current counter values.
    pub fn stats(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_published: self.frames_published.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            faces_detected: self.faces_detected.load(Ordering::Relaxed),
            classifier_failures: self.classifier_failures.load(Ordering::Relaxed),
            warnings_raised: self.warnings_raised.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds() as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Pipeline Statistics:\n\
             - Frames captured: {}\n\
             - Frames published: {}\n\
             - Frames dropped (stale): {}\n\
             - Faces detected: {}\n\
             - Classifier failures: {}\n\
             - Warnings raised: {}\n\
             - Sessions completed: {}\n\
             - Uptime: {} seconds\n\
             \n\
             Retention:\n\
             - Only the most recent annotated frame is held in memory\n\
             - Exports contain period timing, never image data",
            stats.frames_captured,
            stats.frames_published,
            stats.frames_dropped,
            stats.faces_detected,
            stats.classifier_failures,
            stats.warnings_raised,
            stats.sessions_completed,
            stats.uptime_secs
        )
    }

    /// Save counters to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                frames_captured: stats.frames_captured,
                frames_published: stats.frames_published,
                frames_dropped: stats.frames_dropped,
                faces_detected: stats.faces_detected,
                classifier_failures: stats.classifier_failures,
                warnings_raised: stats.warnings_raised,
                sessions_completed: stats.sessions_completed,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load counters from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.frames_captured
                    .store(persisted.frames_captured, Ordering::Relaxed);
                self.frames_published
                    .store(persisted.frames_published, Ordering::Relaxed);
                self.frames_dropped
                    .store(persisted.frames_dropped, Ordering::Relaxed);
                self.faces_detected
                    .store(persisted.faces_detected, Ordering::Relaxed);
                self.classifier_failures
                    .store(persisted.classifier_failures, Ordering::Relaxed);
                self.warnings_raised
                    .store(persisted.warnings_raised, Ordering::Relaxed);
                self.sessions_completed
                    .store(persisted.sessions_completed, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.frames_captured.store(0, Ordering::Relaxed);
        self.frames_published.store(0, Ordering::Relaxed);
        self.frames_dropped.store(0, Ordering::Relaxed);
        self.faces_detected.store(0, Ordering::Relaxed);
        self.classifier_failures.store(0, Ordering::Relaxed);
        self.warnings_raised.store(0, Ordering::Relaxed);
        self.sessions_completed.store(0, Ordering::Relaxed);
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the pipeline counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatsSnapshot {
    pub frames_captured: u64,
    pub frames_published: u64,
    pub frames_dropped: u64,
    pub faces_detected: u64,
    pub classifier_failures: u64,
    pub warnings_raised: u64,
    pub sessions_completed: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    frames_captured: u64,
    frames_published: u64,
    frames_dropped: u64,
    faces_detected: u64,
    classifier_failures: u64,
    warnings_raised: u64,
    sessions_completed: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared pipeline stats.
pub type SharedPipelineStats = Arc<PipelineStats>;

/// Create new shared pipeline stats.
pub fn create_shared_stats() -> SharedPipelineStats {
    Arc::new(PipelineStats::new())
}

/// Create new shared pipeline stats with persistence.
pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedPipelineStats {
    Arc::new(PipelineStats::with_persistence(path))
}
