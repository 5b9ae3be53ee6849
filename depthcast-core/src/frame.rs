//! Frame types shared between the source and the encoder.
//!
//! A [`RawFrame`] is exactly what the sensor hands over: tightly packed
//! rows, top row first, no stride padding.

use std::time::Instant;

use crate::error::DepthcastError;

// ── Sensor geometry ──────────────────────────────────────────────

/// Color stream width of a first-generation Kinect at medium resolution.
pub const KINECT_COLOR_WIDTH: u32 = 640;
/// Color stream height of a first-generation Kinect at medium resolution.
pub const KINECT_COLOR_HEIGHT: u32 = 480;
/// RGB, one byte per channel.
pub const COLOR_BYTES_PER_PIXEL: u32 = 3;

pub const KINECT_DEPTH_WIDTH: u32 = 640;
pub const KINECT_DEPTH_HEIGHT: u32 = 480;
/// 11-bit depth samples packed into two bytes.
pub const DEPTH_BYTES_PER_PIXEL: u32 = 2;

// ── FrameKind ────────────────────────────────────────────────────

/// Stream a frame was delivered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Color,
    Depth,
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameKind::Color => f.write_str("color"),
            FrameKind::Depth => f.write_str("depth"),
        }
    }
}

// ── RawFrame ─────────────────────────────────────────────────────

/// One captured image buffer plus its geometry.
///
/// `data` holds `height` rows of `width * bytes_per_pixel` bytes,
/// top-to-bottom, row-major.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Bytes per pixel as delivered by the sensor.
    pub bytes_per_pixel: u32,
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Monotonic capture timestamp.
    pub timestamp: Instant,
}

impl RawFrame {
    /// Build a frame stamped with the current instant.
    pub fn new(width: u32, height: u32, bytes_per_pixel: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            bytes_per_pixel,
            data,
            timestamp: Instant::now(),
        }
    }

    /// Bytes in one unpadded row.
    pub fn row_len(&self) -> usize {
        self.width as usize * self.bytes_per_pixel as usize
    }

    /// Byte length implied by the frame geometry.
    pub fn expected_len(&self) -> usize {
        self.row_len() * self.height as usize
    }

    /// Check that the geometry is non-degenerate and matches `data`.
    pub fn validate(&self) -> Result<(), DepthcastError> {
        if self.width == 0 || self.height == 0 || self.bytes_per_pixel == 0 {
            return Err(DepthcastError::InvalidFrame(format!(
                "degenerate geometry {}x{}x{}",
                self.width, self.height, self.bytes_per_pixel
            )));
        }
        if self.data.len() != self.expected_len() {
            return Err(DepthcastError::InvalidFrame(format!(
                "buffer holds {} bytes, geometry {}x{}x{} needs {}",
                self.data.len(),
                self.width,
                self.height,
                self.bytes_per_pixel,
                self.expected_len()
            )));
        }
        Ok(())
    }

    /// Returns row `y` (top row is 0).
    ///
    /// # Panics
    ///
    /// Panics if `y >= height` or the buffer is shorter than the geometry.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.row_len();
        &self.data[start..start + self.row_len()]
    }
}

// ── FrameEvent ───────────────────────────────────────────────────

/// A frame-ready notification from the source.
#[derive(Debug, Clone)]
pub struct FrameEvent {
    pub kind: FrameKind,
    pub frame: RawFrame,
}

impl FrameEvent {
    pub fn color(frame: RawFrame) -> Self {
        Self {
            kind: FrameKind::Color,
            frame,
        }
    }

    pub fn depth(frame: RawFrame) -> Self {
        Self {
            kind: FrameKind::Depth,
            frame,
        }
    }
}
