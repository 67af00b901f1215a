//! Integration tests for the capture-to-display pipeline.

use emotion_sentinel_agent::{
    capture::{CaptureWorker, WorkerSettings},
    core::AggregatorSettings,
    poller::{DisplayPoller, FrameSink, PollerSettings},
    stats::{create_shared_stats, SharedPipelineStats},
    synthetic::SyntheticStageFactory,
    transport::{self, FramePacket, FrameReceiver, StopCause},
    vision::EmotionLabel,
    SessionOutcome,
};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        thread::sleep(Duration::from_millis(5));
    }
}

fn stop_after(running: &Arc<AtomicBool>, delay: Duration) {
    let running = Arc::clone(running);
    thread::spawn(move || {
        thread::sleep(delay);
        running.store(false, Ordering::SeqCst);
    });
}

fn worker_with(
    factory: SyntheticStageFactory,
    settings: WorkerSettings,
) -> (CaptureWorker, FrameReceiver, SharedPipelineStats) {
    let (publisher, receiver) = transport::channel();
    let stats = create_shared_stats();
    let worker = CaptureWorker::new(Arc::new(factory), publisher, Arc::clone(&stats), settings);
    (worker, receiver, stats)
}

#[derive(Default)]
struct SinkLog {
    presented: usize,
    shown: usize,
    hidden: usize,
    sessions_over: usize,
}

struct RecordingSink(Arc<Mutex<SinkLog>>);

impl FrameSink for RecordingSink {
    fn present(&mut self, _packet: &FramePacket, _frame: &RgbImage, _alert: EmotionLabel) {
        self.0.lock().unwrap().presented += 1;
    }

    fn show_warning(&mut self) {
        self.0.lock().unwrap().shown += 1;
    }

    fn hide_warning(&mut self) {
        self.0.lock().unwrap().hidden += 1;
    }

    fn session_over(&mut self, _outcome: &SessionOutcome) {
        self.0.lock().unwrap().sessions_over += 1;
    }
}

#[test]
fn test_session_lifecycle_end_to_end() {
    let factory = SyntheticStageFactory::new()
        .with_frame_interval(Duration::from_millis(5))
        .with_timeline(vec![EmotionLabel::Happy]);
    let (mut worker, receiver, stats) = worker_with(factory, WorkerSettings::default());

    worker.start().expect("start");

    // Wait for a published frame and check it decodes at publish size
    let mut packet = None;
    wait_until("a published frame", || {
        packet = receiver.try_receive();
        packet.is_some()
    });
    let packet = packet.unwrap();
    let decoded = image::load_from_memory(&packet.jpeg).expect("decodable jpeg");
    assert_eq!(decoded.width(), 400);
    assert_eq!(decoded.height(), 300);
    assert!(packet.info.has_face());

    thread::sleep(Duration::from_millis(60));
    let outcome = worker.stop_and_finish().expect("outcome");

    assert_eq!(outcome.cause, StopCause::Requested);
    assert!(!outcome.session.is_empty());
    assert!(outcome.session.ended_at.is_some());
    assert!(!outcome.session.periods_for(EmotionLabel::Happy).is_empty());
    assert_eq!(outcome.assessment.session_id, outcome.session.session_id);

    // Producer posted the session-end notice before exiting
    let notice = receiver.try_session_end().expect("session-end notice");
    assert_eq!(notice.cause, StopCause::Requested);

    let snapshot = stats.stats();
    assert!(snapshot.frames_captured > 0);
    assert!(snapshot.frames_published > 0);
    assert!(snapshot.faces_detected > 0);
    assert_eq!(snapshot.sessions_completed, 1);
}

#[test]
fn test_device_failure_preserves_partial_results() {
    let factory = SyntheticStageFactory::new()
        .with_frame_interval(Duration::from_millis(2))
        .with_timeline(vec![EmotionLabel::Sad])
        .failing_after(8);
    let (mut worker, _receiver, _stats) = worker_with(factory, WorkerSettings::default());

    worker.start().expect("start");
    wait_until("session to fail", || !worker.is_running());

    let outcome = worker.take_outcome().expect("outcome");
    assert_eq!(outcome.cause, StopCause::DeviceFailure);
    assert!(!outcome.session.is_empty());
    assert!(outcome.session.ended_at.is_some());
    assert!(!outcome.session.periods_for(EmotionLabel::Sad).is_empty());
}

#[test]
fn test_warning_raises_and_clears_across_transport() {
    // Sad runs 40 frames at 5ms, well past the 100ms threshold; the
    // Neutral stretch that follows clears the warning.
    let factory = SyntheticStageFactory::new()
        .with_frame_interval(Duration::from_millis(5))
        .with_timeline(vec![EmotionLabel::Sad, EmotionLabel::Neutral])
        .with_hold(40)
        .cycling();
    let worker_settings = WorkerSettings {
        aggregator: AggregatorSettings {
            warning_threshold_ms: 100,
            ..AggregatorSettings::default()
        },
        ..WorkerSettings::default()
    };
    let (publisher, receiver) = transport::channel();
    let worker = CaptureWorker::new(
        Arc::new(factory),
        publisher,
        create_shared_stats(),
        worker_settings,
    );
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let sink = RecordingSink(Arc::clone(&log));
    let settings = PollerSettings {
        poll_interval_ms: 5,
        auto_restart: false,
    };
    let poller = DisplayPoller::new(worker, receiver, sink, settings);

    let running = Arc::new(AtomicBool::new(true));
    stop_after(&running, Duration::from_millis(700));
    let outcomes = poller.run(running);

    assert_eq!(outcomes.len(), 1);
    let log = log.lock().unwrap();
    assert!(log.presented > 0);
    assert!(log.shown >= 1, "warning never raised");
    assert!(log.hidden >= 1, "warning never cleared");
}

#[test]
fn test_auto_restart_spawns_new_session_after_device_failure() {
    let factory = SyntheticStageFactory::new()
        .with_frame_interval(Duration::from_millis(2))
        .with_timeline(vec![EmotionLabel::Neutral])
        .failing_after(3);
    let (publisher, receiver) = transport::channel();
    let worker = CaptureWorker::new(
        Arc::new(factory),
        publisher,
        create_shared_stats(),
        WorkerSettings::default(),
    );
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let sink = RecordingSink(Arc::clone(&log));
    let settings = PollerSettings {
        poll_interval_ms: 5,
        auto_restart: true,
    };
    let poller = DisplayPoller::new(worker, receiver, sink, settings);

    let running = Arc::new(AtomicBool::new(true));
    stop_after(&running, Duration::from_millis(500));
    let outcomes = poller.run(running);

    assert!(
        outcomes.len() >= 2,
        "expected restarts, got {} outcome(s)",
        outcomes.len()
    );
    assert_eq!(outcomes[0].cause, StopCause::DeviceFailure);
    assert_ne!(
        outcomes[0].session.session_id, outcomes[1].session.session_id,
        "each restart opens a fresh session"
    );
    assert_eq!(log.lock().unwrap().sessions_over, outcomes.len());
}

#[test]
fn test_consumer_sees_only_latest_frame() {
    let factory = SyntheticStageFactory::new()
        .with_frame_interval(Duration::from_millis(2))
        .with_timeline(vec![EmotionLabel::Happy]);
    let (mut worker, receiver, stats) = worker_with(factory, WorkerSettings::default());

    worker.start().expect("start");

    // Let the producer outpace us, then poll once
    thread::sleep(Duration::from_millis(100));
    let first = receiver.try_receive().expect("a frame");
    let second = receiver.try_receive();
    assert!(
        second.is_none() || second.unwrap().info.captured_at > first.info.captured_at,
        "lane must never hold more than the freshest frame"
    );

    worker.stop_and_finish().expect("outcome");
    let snapshot = stats.stats();
    assert!(
        snapshot.frames_dropped > 0,
        "unpolled publishes must overwrite, not queue"
    );
}
