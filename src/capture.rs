//! Capture worker: the producer side of the pipeline.
//!
//! One worker owns one camera session at a time. `start` spawns a
//! dedicated thread that builds the capture stages, then loops: read a
//! frame, mirror it, detect faces, classify each region, annotate the
//! frame, aggregate labels into periods, and publish the encoded result.
//! The thread returns a [`SessionOutcome`] carrying the finalized periods
//! and their assessment.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::{CameraDevice, DeviceError, RawFrame};
use crate::core::aggregator::{AggregatorSettings, EmotionAggregator, SessionInfo};
use crate::core::evaluate::{EvaluatorSettings, SessionAssessment, SessionEvaluator};
use crate::stats::{PipelineStats, SharedPipelineStats};
use crate::transport::{FramePacket, FramePublisher, StopCause};
use crate::vision::{
    overlay, prepare_patch, EmotionLabel, FaceClassifier, FaceDetector, FaceObservation, FrameInfo,
};

/// Lifecycle of the capture side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No session; a new one may be started.
    Idle,
    /// A session thread is capturing.
    Running,
    /// The current session is stopping or stopped; its outcome has not
    /// been collected yet.
    Ended,
}

impl Status {
    fn from_u8(raw: u8) -> Status {
        match raw {
            1 => Status::Running,
            2 => Status::Ended,
            _ => Status::Idle,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Status::Idle => "idle",
            Status::Running => "running",
            Status::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Fields shared between the capture thread and its observers.
///
/// The capture side is the only writer; the poller, the viewer, and the
/// CLI read. Stop requests also travel through the status field: setting
/// it to `Ended` asks the loop to exit at its next iteration.
#[derive(Debug)]
pub struct MonitorState {
    status: AtomicU8,
    alert: AtomicU8,
}

impl MonitorState {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(Status::Idle as u8),
            alert: AtomicU8::new(EmotionLabel::NoFace.index()),
        }
    }

    pub fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// Label currently shown on the alert indicator: the last observation
    /// of the most recent frame.
    pub fn alert_label(&self) -> EmotionLabel {
        EmotionLabel::from_index(self.alert.load(Ordering::SeqCst))
            .unwrap_or(EmotionLabel::NoFace)
    }

    fn set_status(&self, status: Status) {
        self.status.store(status as u8, Ordering::SeqCst);
    }

    fn set_alert(&self, label: EmotionLabel) {
        self.alert.store(label.index(), Ordering::SeqCst);
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Capture-side settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Mirror frames horizontally before detection, so the published
    /// stream behaves like a mirror.
    pub mirror: bool,
    /// Width of the published frame.
    pub publish_width: u32,
    /// Height of the published frame.
    pub publish_height: u32,
    /// JPEG quality of the published frame (1-100).
    pub jpeg_quality: u8,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            mirror: true,
            publish_width: 400,
            publish_height: 300,
            jpeg_quality: 90,
        }
    }
}

/// Everything a capture session needs, bundled.
#[derive(Debug, Clone, Default)]
pub struct WorkerSettings {
    pub capture: CaptureSettings,
    pub aggregator: AggregatorSettings,
    pub evaluator: EvaluatorSettings,
}

/// The stages one session runs with, built fresh per start.
pub struct CaptureStages {
    pub camera: Box<dyn CameraDevice>,
    pub detector: Box<dyn FaceDetector>,
    pub classifier: Box<dyn FaceClassifier>,
}

/// Builds capture stages on the session thread.
///
/// Called once per session start, from inside the spawned thread, so a
/// device that fails to open surfaces as a device-failure outcome rather
/// than a start error.
pub trait StageFactory: Send + Sync {
    fn build(&self) -> Result<CaptureStages, DeviceError>;
}

/// What one completed session hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    /// Identifier of the capturing agent instance.
    pub device: String,
    pub session: SessionInfo,
    pub assessment: SessionAssessment,
    pub cause: StopCause,
    pub finished_at: DateTime<Utc>,
}

/// Errors from driving the capture worker.
#[derive(Debug)]
pub enum CaptureError {
    /// A session is already running.
    AlreadyRunning,
    /// A finished session's outcome has not been collected yet.
    OutcomePending,
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::AlreadyRunning => write!(f, "A capture session is already running"),
            CaptureError::OutcomePending => {
                write!(f, "The previous session's outcome has not been collected")
            }
        }
    }
}

impl std::error::Error for CaptureError {}

/// Owns the session thread and the shared monitor state.
pub struct CaptureWorker {
    factory: Arc<dyn StageFactory>,
    publisher: FramePublisher,
    stats: SharedPipelineStats,
    settings: WorkerSettings,
    state: Arc<MonitorState>,
    device: String,
    handle: Option<JoinHandle<SessionOutcome>>,
}

impl CaptureWorker {
    pub fn new(
        factory: Arc<dyn StageFactory>,
        publisher: FramePublisher,
        stats: SharedPipelineStats,
        settings: WorkerSettings,
    ) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let device = format!("cam-{}-{}", host, &Uuid::new_v4().to_string()[..8]);

        Self {
            factory,
            publisher,
            stats,
            settings,
            state: Arc::new(MonitorState::new()),
            device,
            handle: None,
        }
    }

    /// Stable identifier of this capturing instance.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Handle to the shared monitor state for read-side collaborators.
    pub fn state(&self) -> Arc<MonitorState> {
        Arc::clone(&self.state)
    }

    pub fn status(&self) -> Status {
        self.state.status()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Spawn a new session thread.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.is_running() {
            return Err(CaptureError::AlreadyRunning);
        }
        if self.handle.is_some() {
            return Err(CaptureError::OutcomePending);
        }

        self.state.set_status(Status::Running);
        self.state.set_alert(EmotionLabel::NoFace);

        let factory = Arc::clone(&self.factory);
        let publisher = self.publisher.clone();
        let state = Arc::clone(&self.state);
        let stats = Arc::clone(&self.stats);
        let settings = self.settings.clone();
        let device = self.device.clone();

        self.handle = Some(thread::spawn(move || {
            run_session(
                factory.as_ref(),
                &publisher,
                &state,
                &stats,
                &settings,
                device,
            )
        }));

        Ok(())
    }

    /// Ask the running session to stop. Returns immediately; the capture
    /// loop notices at its next iteration.
    pub fn stop(&self) {
        if self.state.status() == Status::Running {
            self.state.set_status(Status::Ended);
        }
    }

    /// Collect the outcome of a finished session without blocking.
    /// Returns `None` while a session is still running, after a session
    /// thread panicked, or when there is nothing to collect.
    pub fn take_outcome(&mut self) -> Option<SessionOutcome> {
        match self.handle.take() {
            Some(handle) if handle.is_finished() => {
                let outcome = handle.join().ok();
                self.state.set_status(Status::Idle);
                outcome
            }
            Some(handle) => {
                self.handle = Some(handle);
                None
            }
            None => None,
        }
    }

    /// Stop the session and block until its outcome is available.
    pub fn stop_and_finish(&mut self) -> Option<SessionOutcome> {
        self.stop();
        match self.handle.take() {
            Some(handle) => {
                let outcome = handle.join().ok();
                self.state.set_status(Status::Idle);
                outcome
            }
            None => None,
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_session(
    factory: &dyn StageFactory,
    publisher: &FramePublisher,
    state: &MonitorState,
    stats: &PipelineStats,
    settings: &WorkerSettings,
    device: String,
) -> SessionOutcome {
    let session_id = format!("SESS-{}", Utc::now().timestamp_millis());
    let mut aggregator = EmotionAggregator::new(&session_id, settings.aggregator.clone());
    let evaluator = SessionEvaluator::new(settings.evaluator.clone());

    let mut last_frame_at: Option<DateTime<Utc>> = None;
    let mut was_warning = false;

    let cause = match factory.build() {
        Err(e) => {
            eprintln!("Failed to open capture stages: {e}");
            StopCause::DeviceFailure
        }
        Ok(mut stages) => loop {
            if state.status() == Status::Ended {
                break StopCause::Requested;
            }

            let frame = match stages.camera.read_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    eprintln!("Camera read failed: {e}");
                    break StopCause::DeviceFailure;
                }
            };
            stats.record_frame_captured();

            let (pixels, info) = analyze_frame(
                frame,
                &mut stages,
                &mut aggregator,
                stats,
                &settings.capture,
            );
            state.set_alert(info.alert_label());
            if info.warning && !was_warning {
                stats.record_warning_raised();
            }
            was_warning = info.warning;
            last_frame_at = Some(info.captured_at);

            if let Err(e) = publish_frame(&pixels, info, publisher, stats, &settings.capture) {
                eprintln!("Failed to publish frame: {e}");
                break StopCause::Fault;
            }
        },
        // The stages drop here, releasing the camera before the outcome
        // is assembled.
    };

    state.set_status(Status::Ended);
    let finished_at = Utc::now();
    let session = aggregator.finish(last_frame_at.unwrap_or(finished_at));
    let assessment = evaluator.evaluate(&session);
    publisher.notify_end(cause, finished_at);
    stats.record_session_completed();

    SessionOutcome {
        device,
        session,
        assessment,
        cause,
        finished_at,
    }
}

/// Run the vision stages over one frame and fold the result into the
/// aggregator. Returns the annotated full-resolution frame and its info.
fn analyze_frame(
    frame: RawFrame,
    stages: &mut CaptureStages,
    aggregator: &mut EmotionAggregator,
    stats: &PipelineStats,
    settings: &CaptureSettings,
) -> (RgbImage, FrameInfo) {
    let RawFrame {
        mut pixels,
        captured_at,
    } = frame;

    if settings.mirror {
        pixels = imageops::flip_horizontal(&pixels);
    }
    let gray = imageops::grayscale(&pixels);
    let regions = stages.detector.detect(&gray);

    let mut observations = Vec::with_capacity(regions.len());
    for region in regions {
        let patch = prepare_patch(&gray, &region);
        let label = match stages.classifier.classify(&patch) {
            Ok(label) => label,
            Err(e) => {
                // One bad patch degrades to no-face; the session keeps going.
                eprintln!("Classification failed: {e}");
                stats.record_classifier_failure();
                EmotionLabel::NoFace
            }
        };
        overlay::draw_face_marker(&mut pixels, &region, label);
        aggregator.add_frame(label, captured_at);
        stats.record_face_detected();
        observations.push(FaceObservation { region, label });
    }
    if observations.is_empty() {
        aggregator.add_frame(EmotionLabel::NoFace, captured_at);
    }

    let info = FrameInfo {
        captured_at,
        observations,
        warning: aggregator.warning(),
    };
    (pixels, info)
}

/// Scale the annotated frame to the publish size, encode it, and hand it
/// to the transport.
fn publish_frame(
    pixels: &RgbImage,
    info: FrameInfo,
    publisher: &FramePublisher,
    stats: &PipelineStats,
    settings: &CaptureSettings,
) -> Result<(), image::ImageError> {
    let resized = imageops::resize(
        pixels,
        settings.publish_width,
        settings.publish_height,
        imageops::FilterType::CatmullRom,
    );
    let jpeg = encode_jpeg(&resized, settings.jpeg_quality)?;
    if publisher.publish(FramePacket { jpeg, info }) {
        stats.record_frame_dropped();
    }
    stats.record_frame_published();
    Ok(())
}

/// JPEG-encode an RGB frame at the given quality.
pub fn encode_jpeg(pixels: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    pixels.write_with_encoder(encoder)?;
    Ok(jpeg)
}
