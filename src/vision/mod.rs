//! Face detection, emotion classification, and frame annotation.
//!
//! The capture worker runs these stages in order on every frame:
//! detect face regions on the mirrored grayscale frame, classify each
//! region's 48x48 patch, then draw the annotated markers back onto the
//! color frame. The per-frame result travels alongside the encoded
//! frame as a [`FrameInfo`].

pub mod classify;
pub mod detect;
pub mod label;
pub mod overlay;

pub use classify::{prepare_patch, ClassifierError, FaceClassifier, PATCH_SIZE};
pub use detect::{BrightRegionDetector, FaceDetector, FaceRegion};
pub use label::EmotionLabel;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One detected face and its classified emotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceObservation {
    pub region: FaceRegion,
    pub label: EmotionLabel,
}

/// Per-frame detection result carried with each published frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameInfo {
    pub captured_at: DateTime<Utc>,
    /// Observations in detection order; empty when no face was found.
    pub observations: Vec<FaceObservation>,
    /// Sustained-negative warning state as of this frame.
    pub warning: bool,
}

impl FrameInfo {
    pub fn has_face(&self) -> bool {
        !self.observations.is_empty()
    }

    /// Label shown on the alert indicator: the last observation's label,
    /// or [`EmotionLabel::NoFace`] when the frame had no detections.
    pub fn alert_label(&self) -> EmotionLabel {
        self.observations
            .last()
            .map(|obs| obs.label)
            .unwrap_or(EmotionLabel::NoFace)
    }
}
