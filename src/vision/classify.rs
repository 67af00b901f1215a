//! Emotion classification over fixed-size grayscale patches.

use image::{imageops, GrayImage};

use crate::vision::detect::FaceRegion;
use crate::vision::label::EmotionLabel;

/// Side length of the square grayscale patch a classifier receives.
pub const PATCH_SIZE: u32 = 48;

/// Errors produced by a classification stage.
#[derive(Debug)]
pub enum ClassifierError {
    /// The input patch was unusable.
    BadPatch(String),
    /// The model itself failed.
    Inference(String),
}

impl std::fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierError::BadPatch(msg) => write!(f, "Unusable face patch: {}", msg),
            ClassifierError::Inference(msg) => write!(f, "Classifier inference failed: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

/// Maps a prepared face patch to an emotion label.
///
/// Implementations must be deterministic: the same patch always yields the
/// same label. A failed classification degrades that observation to
/// [`EmotionLabel::NoFace`] in the capture loop; it never aborts the
/// session.
pub trait FaceClassifier: Send {
    fn classify(&mut self, patch: &GrayImage) -> Result<EmotionLabel, ClassifierError>;
}

/// Crop a detected region out of the grayscale frame and scale it to the
/// classifier input size.
///
/// The region is clamped to the frame bounds first; a region entirely
/// outside the frame yields an all-black patch.
pub fn prepare_patch(gray: &GrayImage, region: &FaceRegion) -> GrayImage {
    let (width, height) = gray.dimensions();
    let x = region.x.min(width);
    let y = region.y.min(height);
    let crop_width = region.width.min(width - x);
    let crop_height = region.height.min(height - y);
    if crop_width == 0 || crop_height == 0 {
        return GrayImage::new(PATCH_SIZE, PATCH_SIZE);
    }
    let cropped = imageops::crop_imm(gray, x, y, crop_width, crop_height).to_image();
    imageops::resize(
        &cropped,
        PATCH_SIZE,
        PATCH_SIZE,
        imageops::FilterType::Triangle,
    )
}
