//! Consumer-side display poller.
//!
//! Polls the transport on a fixed cadence, decodes whatever frame is
//! pending, and drives a [`FrameSink`]. The poller also supervises the
//! capture worker: it collects finished session outcomes, restarts the
//! producer after a device failure or a crashed session thread, and
//! stops for good once a stop was explicitly requested.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::tick;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::capture::{CaptureWorker, MonitorState, SessionOutcome};
use crate::transport::{FramePacket, FrameReceiver, StopCause};
use crate::vision::EmotionLabel;

/// Poll cadence and restart policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Time between polls of the frame lane, in milliseconds.
    pub poll_interval_ms: u64,
    /// Start a fresh session after a device failure. A requested stop
    /// never restarts regardless of this setting.
    pub auto_restart: bool,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            auto_restart: true,
        }
    }
}

/// Where decoded frames and session events go.
///
/// `present` is called once per received frame. The warning hooks fire
/// only on edges: once when the sustained-negative warning raises, once
/// when it clears.
pub trait FrameSink {
    fn present(&mut self, packet: &FramePacket, frame: &RgbImage, alert: EmotionLabel);

    fn show_warning(&mut self) {}

    fn hide_warning(&mut self) {}

    fn session_over(&mut self, _outcome: &SessionOutcome) {}
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn present(&mut self, packet: &FramePacket, frame: &RgbImage, alert: EmotionLabel) {
        (**self).present(packet, frame, alert)
    }

    fn show_warning(&mut self) {
        (**self).show_warning()
    }

    fn hide_warning(&mut self) {
        (**self).hide_warning()
    }

    fn session_over(&mut self, outcome: &SessionOutcome) {
        (**self).session_over(outcome)
    }
}

/// Writes the most recent annotated frame to a fixed path, for an
/// external surface that reloads the file. The file is removed when the
/// session ends, mirroring a stream surface going blank.
pub struct SnapshotSink {
    path: PathBuf,
    written: bool,
}

impl SnapshotSink {
    pub fn new(path: PathBuf) -> Self {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        Self {
            path,
            written: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSink for SnapshotSink {
    fn present(&mut self, packet: &FramePacket, _frame: &RgbImage, _alert: EmotionLabel) {
        if let Err(e) = fs::write(&self.path, &packet.jpeg) {
            eprintln!("Could not write snapshot frame: {e}");
            return;
        }
        self.written = true;
    }

    fn session_over(&mut self, _outcome: &SessionOutcome) {
        if self.written {
            let _ = fs::remove_file(&self.path);
            self.written = false;
        }
    }
}

/// Owns the consumer loop and supervises the capture worker.
pub struct DisplayPoller<S: FrameSink> {
    worker: CaptureWorker,
    receiver: FrameReceiver,
    sink: S,
    settings: PollerSettings,
    state: Arc<MonitorState>,
    last_warning: bool,
}

impl<S: FrameSink> DisplayPoller<S> {
    pub fn new(
        worker: CaptureWorker,
        receiver: FrameReceiver,
        sink: S,
        settings: PollerSettings,
    ) -> Self {
        let state = worker.state();
        Self {
            worker,
            receiver,
            sink,
            settings,
            state,
            last_warning: false,
        }
    }

    /// Run until `running` goes false or no further session is wanted.
    ///
    /// The first session is started from inside the loop, so a worker
    /// that was never started is fine to hand in. Returns the outcomes of
    /// every session that completed, in order.
    pub fn run(mut self, running: Arc<AtomicBool>) -> Vec<SessionOutcome> {
        let ticker = tick(Duration::from_millis(self.settings.poll_interval_ms.max(1)));
        let mut outcomes = Vec::new();
        let mut want_session = true;

        while running.load(Ordering::SeqCst) {
            if ticker.recv().is_err() {
                break;
            }
            self.poll_once(&mut outcomes, &mut want_session);
            if !want_session && !self.worker.is_running() {
                break;
            }
        }

        // Shut the producer down and collect the outcome unless a finished
        // session was already collected above.
        if let Some(outcome) = self.worker.stop_and_finish() {
            if self.last_warning {
                self.sink.hide_warning();
                self.last_warning = false;
            }
            self.sink.session_over(&outcome);
            outcomes.push(outcome);
        }
        outcomes
    }

    fn poll_once(&mut self, outcomes: &mut Vec<SessionOutcome>, want_session: &mut bool) {
        // A termination notice means the producer finished cleanly; the
        // warning dialog must not outlive the session.
        if self.receiver.try_session_end().is_some() && self.last_warning {
            self.sink.hide_warning();
            self.last_warning = false;
        }

        if !self.worker.is_running() {
            if let Some(outcome) = self.worker.take_outcome() {
                let stop_requested = outcome.cause == StopCause::Requested;
                if self.last_warning {
                    self.sink.hide_warning();
                    self.last_warning = false;
                }
                self.sink.session_over(&outcome);
                outcomes.push(outcome);
                if stop_requested || !self.settings.auto_restart {
                    *want_session = false;
                }
            }
            // Covers the initial start, the restart after a device
            // failure, and the respawn after a crashed session thread.
            if *want_session {
                if let Err(e) = self.worker.start() {
                    eprintln!("Could not start capture session: {e}");
                    *want_session = false;
                }
            }
            return;
        }

        if let Some(packet) = self.receiver.try_receive() {
            if packet.info.warning != self.last_warning {
                if packet.info.warning {
                    self.sink.show_warning();
                } else {
                    self.sink.hide_warning();
                }
                self.last_warning = packet.info.warning;
            }
            let alert = self.state.alert_label();
            match image::load_from_memory(&packet.jpeg) {
                Ok(decoded) => self.sink.present(&packet, &decoded.to_rgb8(), alert),
                Err(e) => eprintln!("Could not decode published frame: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::WorkerSettings;
    use crate::core::aggregator::AggregatorSettings;
    use crate::stats::create_shared_stats;
    use crate::synthetic::SyntheticStageFactory;
    use crate::transport;
    use crate::vision::FrameInfo;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::thread;

    #[derive(Default)]
    struct SinkLog {
        presented: usize,
        last_alert: Option<EmotionLabel>,
        last_dims: Option<(u32, u32)>,
        shown: usize,
        hidden: usize,
        sessions_over: usize,
    }

    struct RecordingSink(Arc<Mutex<SinkLog>>);

    impl FrameSink for RecordingSink {
        fn present(&mut self, _packet: &FramePacket, frame: &RgbImage, alert: EmotionLabel) {
            let mut log = self.0.lock().unwrap();
            log.presented += 1;
            log.last_alert = Some(alert);
            log.last_dims = Some(frame.dimensions());
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

    fn poller_with(
        factory: SyntheticStageFactory,
        settings: PollerSettings,
        worker_settings: WorkerSettings,
    ) -> (DisplayPoller<RecordingSink>, Arc<Mutex<SinkLog>>) {
        let (publisher, receiver) = transport::channel();
        let worker = CaptureWorker::new(
            Arc::new(factory),
            publisher,
            create_shared_stats(),
            worker_settings,
        );
        let log = Arc::new(Mutex::new(SinkLog::default()));
        let sink = RecordingSink(Arc::clone(&log));
        (DisplayPoller::new(worker, receiver, sink, settings), log)
    }

    fn stop_after(running: &Arc<AtomicBool>, delay: Duration) {
        let running = Arc::clone(running);
        thread::spawn(move || {
            thread::sleep(delay);
            running.store(false, Ordering::SeqCst);
        });
    }

    #[test]
    fn test_session_runs_until_stop_requested() {
        let factory = SyntheticStageFactory::new()
            .with_frame_interval(Duration::from_millis(5))
            .with_timeline(vec![EmotionLabel::Happy]);
        let settings = PollerSettings {
            poll_interval_ms: 10,
            auto_restart: false,
        };
        let (poller, log) = poller_with(factory, settings, WorkerSettings::default());

        let running = Arc::new(AtomicBool::new(true));
        stop_after(&running, Duration::from_millis(250));
        let outcomes = poller.run(running);

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].cause, StopCause::Requested);
        let log = log.lock().unwrap();
        assert!(log.presented > 0);
        assert_eq!(log.sessions_over, 1);
        assert_eq!(log.last_alert, Some(EmotionLabel::Happy));
        assert_eq!(log.last_dims, Some((400, 300)));
    }

    #[test]
    fn test_device_failure_without_restart_ends_run() {
        let factory = SyntheticStageFactory::new()
            .with_frame_interval(Duration::from_millis(2))
            .failing_after(3);
        let settings = PollerSettings {
            poll_interval_ms: 5,
            auto_restart: false,
        };
        let (poller, log) = poller_with(factory, settings, WorkerSettings::default());

        // No external stop: the run ends on its own once the device dies.
        let outcomes = poller.run(Arc::new(AtomicBool::new(true)));

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].cause, StopCause::DeviceFailure);
        assert_eq!(log.lock().unwrap().sessions_over, 1);
    }

    #[test]
    fn test_device_failure_with_restart_respawns_sessions() {
        let factory = SyntheticStageFactory::new()
            .with_frame_interval(Duration::from_millis(2))
            .failing_after(3);
        let settings = PollerSettings {
            poll_interval_ms: 5,
            auto_restart: true,
        };
        let (poller, log) = poller_with(factory, settings, WorkerSettings::default());

        let running = Arc::new(AtomicBool::new(true));
        stop_after(&running, Duration::from_millis(400));
        let outcomes = poller.run(running);

        assert!(outcomes.len() >= 2, "expected respawned sessions");
        assert!(outcomes
            .iter()
            .filter(|o| o.cause == StopCause::DeviceFailure)
            .count() >= 2);
        assert_eq!(log.lock().unwrap().sessions_over, outcomes.len());
    }

    #[test]
    fn test_warning_edges_reach_sink_once() {
        let factory = SyntheticStageFactory::new()
            .with_frame_interval(Duration::from_millis(5))
            .with_timeline(vec![EmotionLabel::Happy, EmotionLabel::Sad])
            .with_hold(2)
            .failing_after(40);
        let settings = PollerSettings {
            poll_interval_ms: 5,
            auto_restart: false,
        };
        let worker_settings = WorkerSettings {
            aggregator: AggregatorSettings {
                warning_threshold_ms: 30,
                ..AggregatorSettings::default()
            },
            ..WorkerSettings::default()
        };
        let (poller, log) = poller_with(factory, settings, worker_settings);

        let outcomes = poller.run(Arc::new(AtomicBool::new(true)));

        assert_eq!(outcomes.len(), 1);
        let log = log.lock().unwrap();
        // The long Sad run crosses the threshold exactly once, and the
        // end of the session pulls the warning back down.
        assert_eq!(log.shown, 1);
        assert_eq!(log.hidden, 1);
    }

    #[test]
    fn test_snapshot_sink_writes_and_cleans_up() {
        let dir = std::env::temp_dir().join(format!("sentinel-snap-{}", std::process::id()));
        let path = dir.join("latest.jpg");
        let mut sink = SnapshotSink::new(path.clone());

        let packet = FramePacket {
            jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
            info: FrameInfo {
                captured_at: Utc::now(),
                observations: Vec::new(),
                warning: false,
            },
        };
        let frame = RgbImage::new(2, 2);
        sink.present(&packet, &frame, EmotionLabel::NoFace);
        assert_eq!(fs::read(&path).unwrap(), packet.jpeg);

        let factory = SyntheticStageFactory::new()
            .with_frame_interval(Duration::from_millis(2))
            .failing_after(1);
        let (publisher, _receiver) = transport::channel();
        let mut worker = CaptureWorker::new(
            Arc::new(factory),
            publisher,
            create_shared_stats(),
            WorkerSettings::default(),
        );
        worker.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        let outcome = worker.stop_and_finish().expect("outcome");
        sink.session_over(&outcome);
        assert!(!path.exists());

        let _ = fs::remove_dir_all(dir);
    }
}
