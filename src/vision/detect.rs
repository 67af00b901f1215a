//! Face region detection on grayscale frames.

use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned region of a detected face, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// First column to the right of the region.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// First row below the region.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Finds face regions in a grayscale frame.
///
/// Detection runs on the mirrored grayscale frame, once per frame, before
/// classification. Implementations take `&mut self` so detectors may keep
/// internal state between frames.
pub trait FaceDetector: Send {
    fn detect(&mut self, gray: &GrayImage) -> Vec<FaceRegion>;
}

/// Luminance-blob detector used as the built-in detection stage.
///
/// Scans the frame in `cell`-sized tiles, marks tiles whose mean luminance
/// reaches `threshold`, and merges 4-connected marked tiles into blobs.
/// Blobs smaller than `min_side` on either axis are discarded. Fully
/// deterministic: the same frame always yields the same regions, in
/// top-left scan order.
#[derive(Debug, Clone)]
pub struct BrightRegionDetector {
    threshold: u8,
    min_side: u32,
    cell: u32,
}

impl Default for BrightRegionDetector {
    fn default() -> Self {
        Self {
            threshold: 128,
            min_side: 24,
            cell: 8,
        }
    }
}

impl BrightRegionDetector {
    pub fn new(threshold: u8, min_side: u32, cell: u32) -> Self {
        Self {
            threshold,
            min_side,
            cell: cell.max(1),
        }
    }

    fn cell_mean(&self, gray: &GrayImage, cx: u32, cy: u32) -> u8 {
        let (width, height) = gray.dimensions();
        let x0 = cx * self.cell;
        let y0 = cy * self.cell;
        let x1 = (x0 + self.cell).min(width);
        let y1 = (y0 + self.cell).min(height);
        let mut sum: u64 = 0;
        let mut count: u64 = 0;
        for y in y0..y1 {
            for x in x0..x1 {
                sum += gray.get_pixel(x, y)[0] as u64;
                count += 1;
            }
        }
        if count == 0 {
            0
        } else {
            (sum / count) as u8
        }
    }
}

impl FaceDetector for BrightRegionDetector {
    fn detect(&mut self, gray: &GrayImage) -> Vec<FaceRegion> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }
        let cols = (width + self.cell - 1) / self.cell;
        let rows = (height + self.cell - 1) / self.cell;

        let mut marked = vec![false; (cols * rows) as usize];
        for cy in 0..rows {
            for cx in 0..cols {
                if self.cell_mean(gray, cx, cy) >= self.threshold {
                    marked[(cy * cols + cx) as usize] = true;
                }
            }
        }

        // Merge 4-connected marked tiles into blob bounding boxes.
        let mut visited = vec![false; marked.len()];
        let mut regions = Vec::new();
        for start in 0..marked.len() {
            if !marked[start] || visited[start] {
                continue;
            }
            let mut queue = vec![start];
            visited[start] = true;
            let (mut min_cx, mut max_cx) = (cols, 0u32);
            let (mut min_cy, mut max_cy) = (rows, 0u32);
            while let Some(idx) = queue.pop() {
                let cx = idx as u32 % cols;
                let cy = idx as u32 / cols;
                min_cx = min_cx.min(cx);
                max_cx = max_cx.max(cx);
                min_cy = min_cy.min(cy);
                max_cy = max_cy.max(cy);
                let mut push = |nx: u32, ny: u32| {
                    let nidx = (ny * cols + nx) as usize;
                    if marked[nidx] && !visited[nidx] {
                        visited[nidx] = true;
                        queue.push(nidx);
                    }
                };
                if cx > 0 {
                    push(cx - 1, cy);
                }
                if cx + 1 < cols {
                    push(cx + 1, cy);
                }
                if cy > 0 {
                    push(cx, cy - 1);
                }
                if cy + 1 < rows {
                    push(cx, cy + 1);
                }
            }

            let x = min_cx * self.cell;
            let y = min_cy * self.cell;
            let region_width = ((max_cx + 1) * self.cell).min(width) - x;
            let region_height = ((max_cy + 1) * self.cell).min(height) - y;
            if region_width >= self.min_side && region_height >= self.min_side {
                regions.push(FaceRegion::new(x, y, region_width, region_height));
            }
        }

        regions.sort_by_key(|r| (r.y, r.x));
        regions
    }
}
