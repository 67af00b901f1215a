//! Camera device abstraction.
//!
//! The capture worker talks to the device through the [`CameraDevice`]
//! trait so that real hardware and the synthetic test camera are
//! interchangeable. One session owns one device; the device is opened by
//! the stage factory and released when the session's stages are dropped.

use chrono::{DateTime, Utc};
use image::RgbImage;

/// A single frame read from a camera device, stamped at capture time.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub pixels: RgbImage,
    pub captured_at: DateTime<Utc>,
}

impl RawFrame {
    /// Wrap a pixel buffer with the current time as its capture stamp.
    pub fn new(pixels: RgbImage) -> Self {
        Self {
            pixels,
            captured_at: Utc::now(),
        }
    }

    /// Wrap a pixel buffer with an explicit capture stamp.
    pub fn at(pixels: RgbImage, captured_at: DateTime<Utc>) -> Self {
        Self {
            pixels,
            captured_at,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Errors produced while opening or reading a camera device.
#[derive(Debug)]
pub enum DeviceError {
    /// The device could not be opened.
    OpenFailed(String),
    /// The device was open but a frame read failed.
    ReadFailed(String),
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::OpenFailed(msg) => write!(f, "Failed to open camera: {}", msg),
            DeviceError::ReadFailed(msg) => write!(f, "Failed to read frame: {}", msg),
        }
    }
}

impl std::error::Error for DeviceError {}

/// A source of frames.
///
/// `read_frame` blocks until the next frame is available, pacing the
/// capture loop at the device's own cadence. Implementations take
/// `&mut self` because devices are stateful.
pub trait CameraDevice: Send {
    fn read_frame(&mut self) -> Result<RawFrame, DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_frame_carries_dimensions() {
        let frame = RawFrame::new(RgbImage::new(32, 24));
        assert_eq!(frame.dimensions(), (32, 24));
    }

    #[test]
    fn test_explicit_capture_stamp() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let frame = RawFrame::at(RgbImage::new(4, 4), at);
        assert_eq!(frame.captured_at, at);
    }

    #[test]
    fn test_device_error_messages() {
        let err = DeviceError::OpenFailed("no device".to_string());
        assert!(err.to_string().contains("open"));
        let err = DeviceError::ReadFailed("stream closed".to_string());
        assert!(err.to_string().contains("read"));
    }
}
