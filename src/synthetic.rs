//! Synthetic capture stages for demos and tests.
//!
//! No real camera or model is required anywhere in the pipeline: the
//! synthetic camera renders a bright face-like disc drifting over a dark
//! background, and the scripted classifier replays a fixed label
//! timeline. Both are fully deterministic apart from frame timestamps.

use std::thread;
use std::time::Duration;

use image::{GrayImage, Rgb, RgbImage};

use crate::camera::{CameraDevice, DeviceError, RawFrame};
use crate::capture::{CaptureStages, StageFactory};
use crate::vision::{BrightRegionDetector, ClassifierError, EmotionLabel, FaceClassifier};

const BACKGROUND: Rgb<u8> = Rgb([18u8, 18u8, 24u8]);
const FACE_TONE: Rgb<u8> = Rgb([214u8, 186u8, 168u8]);

/// Camera that renders a drifting bright disc.
///
/// `read_frame` sleeps for the configured interval to model the device
/// cadence, so a capture loop reading from it does not spin.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    frame_interval: Duration,
    fail_after: Option<u64>,
    frames_read: u64,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_interval: Duration::from_millis(33),
            fail_after: None,
            frames_read: 0,
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Succeed for `frames` reads, then fail every read with a device
    /// error. Models a camera being unplugged mid-session.
    pub fn failing_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    fn render(&self, phase: u64) -> RgbImage {
        let (width, height) = (self.width, self.height);
        let radius = (width.min(height) / 6).max(8);
        let margin = radius + 2;
        let span_x = width.saturating_sub(2 * margin).max(1) as u64;
        let span_y = height.saturating_sub(2 * margin).max(1) as u64;
        let cx = margin + ((phase * 3) % span_x) as u32;
        let cy = margin + ((phase * 2) % span_y) as u32;

        let mut pixels = RgbImage::from_pixel(width, height, BACKGROUND);
        let r = radius as i64;
        for y in cy.saturating_sub(radius)..=(cy + radius).min(height - 1) {
            for x in cx.saturating_sub(radius)..=(cx + radius).min(width - 1) {
                let dx = x as i64 - cx as i64;
                let dy = y as i64 - cy as i64;
                if dx * dx + dy * dy <= r * r {
                    pixels.put_pixel(x, y, FACE_TONE);
                }
            }
        }
        pixels
    }
}

impl CameraDevice for SyntheticCamera {
    fn read_frame(&mut self) -> Result<RawFrame, DeviceError> {
        if let Some(limit) = self.fail_after {
            if self.frames_read >= limit {
                return Err(DeviceError::ReadFailed(
                    "synthetic device exhausted".to_string(),
                ));
            }
        }
        thread::sleep(self.frame_interval);
        let pixels = self.render(self.frames_read);
        self.frames_read += 1;
        Ok(RawFrame::new(pixels))
    }
}

/// Classifier that replays a fixed label timeline, ignoring patch
/// content.
///
/// Each timeline entry is held for `hold` consecutive classifications.
/// Past the end, the last entry repeats; with [`cycling`](Self::cycling)
/// the timeline wraps around instead.
pub struct ScriptedClassifier {
    timeline: Vec<EmotionLabel>,
    hold: u64,
    cycle: bool,
    calls: u64,
}

impl ScriptedClassifier {
    pub fn new(timeline: Vec<EmotionLabel>) -> Self {
        let timeline = if timeline.is_empty() {
            vec![EmotionLabel::Neutral]
        } else {
            timeline
        };
        Self {
            timeline,
            hold: 1,
            cycle: false,
            calls: 0,
        }
    }

    pub fn with_hold(mut self, frames: u64) -> Self {
        self.hold = frames.max(1);
        self
    }

    pub fn cycling(mut self) -> Self {
        self.cycle = true;
        self
    }
}

impl FaceClassifier for ScriptedClassifier {
    fn classify(&mut self, _patch: &GrayImage) -> Result<EmotionLabel, ClassifierError> {
        let step = (self.calls / self.hold) as usize;
        let index = if self.cycle {
            step % self.timeline.len()
        } else {
            step.min(self.timeline.len() - 1)
        };
        self.calls += 1;
        Ok(self.timeline[index])
    }
}

/// Builds a complete synthetic stage set: drifting-disc camera, the
/// built-in luminance detector, and a scripted classifier.
#[derive(Debug, Clone)]
pub struct SyntheticStageFactory {
    width: u32,
    height: u32,
    frame_interval: Duration,
    fail_after: Option<u64>,
    timeline: Vec<EmotionLabel>,
    hold: u64,
    cycle: bool,
}

impl SyntheticStageFactory {
    pub fn new() -> Self {
        Self {
            width: 320,
            height: 240,
            frame_interval: Duration::from_millis(33),
            fail_after: None,
            timeline: vec![EmotionLabel::Neutral],
            hold: 1,
            cycle: false,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Make each session's camera fail after `frames` reads.
    pub fn failing_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    pub fn with_timeline(mut self, timeline: Vec<EmotionLabel>) -> Self {
        self.timeline = timeline;
        self
    }

    /// Hold each timeline entry for `frames` consecutive frames.
    pub fn with_hold(mut self, frames: u64) -> Self {
        self.hold = frames.max(1);
        self
    }

    /// Wrap the timeline instead of repeating its last entry.
    pub fn cycling(mut self) -> Self {
        self.cycle = true;
        self
    }
}

impl Default for SyntheticStageFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl StageFactory for SyntheticStageFactory {
    fn build(&self) -> Result<CaptureStages, DeviceError> {
        let mut camera =
            SyntheticCamera::new(self.width, self.height).with_frame_interval(self.frame_interval);
        if let Some(limit) = self.fail_after {
            camera = camera.failing_after(limit);
        }
        let mut classifier = ScriptedClassifier::new(self.timeline.clone()).with_hold(self.hold);
        if self.cycle {
            classifier = classifier.cycling();
        }
        Ok(CaptureStages {
            camera: Box::new(camera),
            detector: Box::new(BrightRegionDetector::default()),
            classifier: Box::new(classifier),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::FaceDetector;
    use image::imageops;

    #[test]
    fn test_rendered_frames_are_deterministic() {
        let mut first = SyntheticCamera::new(160, 120).with_frame_interval(Duration::ZERO);
        let mut second = SyntheticCamera::new(160, 120).with_frame_interval(Duration::ZERO);
        for _ in 0..3 {
            let a = first.read_frame().unwrap();
            let b = second.read_frame().unwrap();
            assert_eq!(a.pixels, b.pixels);
        }
    }

    #[test]
    fn test_disc_drifts_between_frames() {
        let mut camera = SyntheticCamera::new(160, 120).with_frame_interval(Duration::ZERO);
        let a = camera.read_frame().unwrap();
        let b = camera.read_frame().unwrap();
        assert_ne!(a.pixels, b.pixels);
    }

    #[test]
    fn test_camera_fails_after_limit() {
        let mut camera = SyntheticCamera::new(64, 64)
            .with_frame_interval(Duration::ZERO)
            .failing_after(2);
        assert!(camera.read_frame().is_ok());
        assert!(camera.read_frame().is_ok());
        let err = camera.read_frame().unwrap_err();
        assert!(matches!(err, DeviceError::ReadFailed(_)));
        // Subsequent reads keep failing.
        assert!(camera.read_frame().is_err());
    }

    #[test]
    fn test_scripted_classifier_holds_and_repeats_last() {
        let patch = GrayImage::new(48, 48);
        let mut classifier =
            ScriptedClassifier::new(vec![EmotionLabel::Happy, EmotionLabel::Sad]).with_hold(2);
        let labels: Vec<_> = (0..6).map(|_| classifier.classify(&patch).unwrap()).collect();
        assert_eq!(
            labels,
            vec![
                EmotionLabel::Happy,
                EmotionLabel::Happy,
                EmotionLabel::Sad,
                EmotionLabel::Sad,
                EmotionLabel::Sad,
                EmotionLabel::Sad,
            ]
        );
    }

    #[test]
    fn test_scripted_classifier_cycles() {
        let patch = GrayImage::new(48, 48);
        let mut classifier =
            ScriptedClassifier::new(vec![EmotionLabel::Happy, EmotionLabel::Angry]).cycling();
        let labels: Vec<_> = (0..4).map(|_| classifier.classify(&patch).unwrap()).collect();
        assert_eq!(
            labels,
            vec![
                EmotionLabel::Happy,
                EmotionLabel::Angry,
                EmotionLabel::Happy,
                EmotionLabel::Angry,
            ]
        );
    }

    #[test]
    fn test_empty_timeline_defaults_to_neutral() {
        let patch = GrayImage::new(48, 48);
        let mut classifier = ScriptedClassifier::new(Vec::new());
        assert_eq!(classifier.classify(&patch).unwrap(), EmotionLabel::Neutral);
    }

    #[test]
    fn test_factory_scene_is_detectable() {
        let factory = SyntheticStageFactory::new().with_frame_interval(Duration::ZERO);
        let mut stages = factory.build().unwrap();
        let frame = stages.camera.read_frame().unwrap();
        let gray = imageops::grayscale(&frame.pixels);
        let regions = stages.detector.detect(&gray);
        assert_eq!(regions.len(), 1);
        assert!(regions[0].width >= 48);
    }
}
