//! Emotion labels and their fixed display colors.
//!
//! The label set and its wire indices mirror the classification model's
//! output head; the color table is the 1:1 static mapping used for every
//! display surface (overlay chips, alert indicator, viewer state).

use serde::{Deserialize, Serialize};

/// One emotion class from the classifier's fixed output head.
///
/// Variants are declared in wire-index order (0..=7), so the derived
/// `Ord` matches the model's label indices.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EmotionLabel {
    Angry,
    Disgusted,
    Fearful,
    Happy,
    Neutral,
    Sad,
    Surprised,
    /// Attributed to frames in which no face region was found.
    NoFace,
}

impl EmotionLabel {
    /// All labels in wire-index order.
    pub const ALL: [EmotionLabel; 8] = [
        EmotionLabel::Angry,
        EmotionLabel::Disgusted,
        EmotionLabel::Fearful,
        EmotionLabel::Happy,
        EmotionLabel::Neutral,
        EmotionLabel::Sad,
        EmotionLabel::Surprised,
        EmotionLabel::NoFace,
    ];

    /// Look up a label by its wire index.
    pub fn from_index(index: u8) -> Option<EmotionLabel> {
        Self::ALL.get(index as usize).copied()
    }

    /// The label's wire index in the model's output head.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Human-readable label name.
    pub fn as_str(self) -> &'static str {
        match self {
            EmotionLabel::Angry => "Angry",
            EmotionLabel::Disgusted => "Disgusted",
            EmotionLabel::Fearful => "Fearful",
            EmotionLabel::Happy => "Happy",
            EmotionLabel::Neutral => "Neutral",
            EmotionLabel::Sad => "Sad",
            EmotionLabel::Surprised => "Surprised",
            EmotionLabel::NoFace => "No face detected",
        }
    }

    /// Fixed display color as a `#RRGGBB` string.
    pub fn color_hex(self) -> &'static str {
        match self {
            EmotionLabel::Angry => "#FF005A",
            EmotionLabel::Disgusted => "#33CC33",
            EmotionLabel::Fearful => "#9933FF",
            EmotionLabel::Happy => "#FFCC00",
            EmotionLabel::Neutral => "#996600",
            EmotionLabel::Sad => "#0099FF",
            EmotionLabel::Surprised => "#33CCCC",
            EmotionLabel::NoFace => "#000000",
        }
    }

    /// Fixed display color as RGB components.
    pub fn color_rgb(self) -> [u8; 3] {
        match self {
            EmotionLabel::Angry => [0xFF, 0x00, 0x5A],
            EmotionLabel::Disgusted => [0x33, 0xCC, 0x33],
            EmotionLabel::Fearful => [0x99, 0x33, 0xFF],
            EmotionLabel::Happy => [0xFF, 0xCC, 0x00],
            EmotionLabel::Neutral => [0x99, 0x66, 0x00],
            EmotionLabel::Sad => [0x00, 0x99, 0xFF],
            EmotionLabel::Surprised => [0x33, 0xCC, 0xCC],
            EmotionLabel::NoFace => [0x00, 0x00, 0x00],
        }
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
