//! Frame sources.
//!
//! A [`FrameSource`] is the sensor side of the pipeline: it owns the
//! device session and hands out one [`FrameEvent`] at a time. The
//! session life cycle mirrors a camera driver's:
//!
//! ```text
//! open ─► start ─► next_event … next_event ─► stop ─► close
//! ```
//!
//! Two implementations ship with the crate:
//!
//! - [`SyntheticSource`]: paced test-pattern generator with the
//!   geometry of a first-generation Kinect, for running without
//!   hardware.
//! - [`ScriptedSource`]: replays a fixed list of events, for tests.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::bitmap::BitmapHeader;
use crate::error::{DepthcastError, DeviceStage};
use crate::frame::{
    COLOR_BYTES_PER_PIXEL, DEPTH_BYTES_PER_PIXEL, FrameEvent, KINECT_COLOR_HEIGHT,
    KINECT_COLOR_WIDTH, KINECT_DEPTH_HEIGHT, KINECT_DEPTH_WIDTH, RawFrame,
};

// ── FrameSource ──────────────────────────────────────────────────

/// Producer of raw frames.
#[async_trait]
pub trait FrameSource: Send {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Acquire the device and configure its modes.
    fn open(&mut self) -> Result<(), DepthcastError>;

    /// Start the depth and color streams.
    fn start(&mut self) -> Result<(), DepthcastError>;

    /// Wait for the next frame.
    ///
    /// `Ok(None)` means the source has nothing more to deliver.
    async fn next_event(&mut self) -> Result<Option<FrameEvent>, DepthcastError>;

    /// Stop the streams started by [`start`](Self::start).
    fn stop(&mut self) -> Result<(), DepthcastError>;

    /// Release the device acquired by [`open`](Self::open).
    fn close(&mut self) -> Result<(), DepthcastError>;
}

/// Where a source is in its session life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Closed,
    Open,
    Streaming,
}

impl Session {
    fn open(&mut self) -> Result<(), DepthcastError> {
        if *self != Session::Closed {
            return Err(DepthcastError::device(DeviceStage::Open, "already open"));
        }
        *self = Session::Open;
        Ok(())
    }

    fn start(&mut self) -> Result<(), DepthcastError> {
        if *self != Session::Open {
            return Err(DepthcastError::device(DeviceStage::Start, "device not open"));
        }
        *self = Session::Streaming;
        Ok(())
    }

    fn ensure_streaming(&self) -> Result<(), DepthcastError> {
        if *self != Session::Streaming {
            return Err(DepthcastError::device(DeviceStage::Receive, "streams not started"));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DepthcastError> {
        if *self != Session::Streaming {
            return Err(DepthcastError::device(DeviceStage::Stop, "streams not started"));
        }
        *self = Session::Open;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DepthcastError> {
        match *self {
            Session::Open => {
                *self = Session::Closed;
                Ok(())
            }
            Session::Streaming => Err(DepthcastError::device(
                DeviceStage::Close,
                "streams still running",
            )),
            Session::Closed => Err(DepthcastError::device(DeviceStage::Close, "not open")),
        }
    }
}

// ── SyntheticSource ──────────────────────────────────────────────

/// Settings for [`SyntheticSource`].
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    /// Color frames per second.
    pub fps: u32,
    /// Emit a depth frame before every color frame.
    pub depth_enabled: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: KINECT_COLOR_WIDTH,
            height: KINECT_COLOR_HEIGHT,
            fps: 30,
            depth_enabled: true,
        }
    }
}

/// Paced test-pattern generator.
///
/// Color frames are a horizontal red ramp, a vertical green ramp and a
/// blue channel that advances with the frame number. Depth frames are a
/// constant 11-bit plane.
pub struct SyntheticSource {
    config: SyntheticConfig,
    session: Session,
    frame_number: u64,
    depth_pending: bool,
    next_due: Option<Instant>,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            session: Session::Closed,
            frame_number: 0,
            depth_pending: false,
            next_due: None,
        }
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.fps.max(1) as f64)
    }

    fn color_frame(&self) -> RawFrame {
        let (w, h) = (u64::from(self.config.width), u64::from(self.config.height));
        let blue = (self.frame_number % 256) as u8;
        let len = color_frame_len(self.config.width, self.config.height).unwrap_or_default();
        let mut data = Vec::with_capacity(len);
        for y in 0..h {
            let green = (y * 255 / h.max(1)) as u8;
            for x in 0..w {
                let red = (x * 255 / w.max(1)) as u8;
                data.extend_from_slice(&[red, green, blue]);
            }
        }
        RawFrame::new(
            self.config.width,
            self.config.height,
            COLOR_BYTES_PER_PIXEL,
            data,
        )
    }

    fn depth_frame(&self) -> RawFrame {
        let (w, h) = (KINECT_DEPTH_WIDTH, KINECT_DEPTH_HEIGHT);
        let sample = 0x03FFu16.to_le_bytes();
        let data = sample
            .iter()
            .copied()
            .cycle()
            .take(w as usize * h as usize * DEPTH_BYTES_PER_PIXEL as usize)
            .collect();
        RawFrame::new(w, h, DEPTH_BYTES_PER_PIXEL, data)
    }
}

#[async_trait]
impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn open(&mut self) -> Result<(), DepthcastError> {
        let (w, h) = (self.config.width, self.config.height);
        let unsupported = |why: &str| {
            DepthcastError::device(DeviceStage::Open, format!("unsupported video mode {w}x{h}: {why}"))
        };
        if w == 0 || h == 0 {
            return Err(unsupported("empty frame"));
        }
        // Every frame must be encodable and addressable in memory.
        BitmapHeader::for_dimensions(w, h).map_err(|_| unsupported("exceeds bitmap limits"))?;
        color_frame_len(w, h).ok_or_else(|| unsupported("frame too large"))?;
        self.session.open()
    }

    fn start(&mut self) -> Result<(), DepthcastError> {
        self.session.start()?;
        self.depth_pending = self.config.depth_enabled;
        self.next_due = Some(Instant::now());
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<FrameEvent>, DepthcastError> {
        self.session.ensure_streaming()?;

        if self.depth_pending {
            self.depth_pending = false;
            return Ok(Some(FrameEvent::depth(self.depth_frame())));
        }

        // Pace color frames to the configured rate.
        if let Some(due) = self.next_due {
            let now = Instant::now();
            if due > now {
                tokio::time::sleep(due - now).await;
            }
        }
        self.next_due = Some(Instant::now() + self.frame_interval());

        let frame = self.color_frame();
        self.frame_number += 1;
        self.depth_pending = self.config.depth_enabled;
        Ok(Some(FrameEvent::color(frame)))
    }

    fn stop(&mut self) -> Result<(), DepthcastError> {
        self.session.stop()
    }

    fn close(&mut self) -> Result<(), DepthcastError> {
        self.session.close()
    }
}

/// Byte length of a `width` x `height` RGB frame, if it fits in memory.
fn color_frame_len(width: u32, height: u32) -> Option<usize> {
    usize::try_from(width)
        .ok()?
        .checked_mul(usize::try_from(height).ok()?)?
        .checked_mul(COLOR_BYTES_PER_PIXEL as usize)
}

// ── ScriptedSource ───────────────────────────────────────────────

/// Replays a fixed sequence of events, then reports exhaustion.
pub struct ScriptedSource {
    events: VecDeque<FrameEvent>,
    session: Session,
    log: Vec<DeviceStage>,
}

impl ScriptedSource {
    pub fn new(events: impl IntoIterator<Item = FrameEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            session: Session::Closed,
            log: Vec::new(),
        }
    }

    /// Life-cycle calls made so far, in order. Receives are not logged.
    pub fn lifecycle(&self) -> &[DeviceStage] {
        &self.log
    }

    /// Events not yet delivered.
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl FrameSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn open(&mut self) -> Result<(), DepthcastError> {
        self.log.push(DeviceStage::Open);
        self.session.open()
    }

    fn start(&mut self) -> Result<(), DepthcastError> {
        self.log.push(DeviceStage::Start);
        self.session.start()
    }

    async fn next_event(&mut self) -> Result<Option<FrameEvent>, DepthcastError> {
        self.session.ensure_streaming()?;
        Ok(self.events.pop_front())
    }

    fn stop(&mut self) -> Result<(), DepthcastError> {
        self.log.push(DeviceStage::Stop);
        self.session.stop()
    }

    fn close(&mut self) -> Result<(), DepthcastError> {
        self.log.push(DeviceStage::Close);
        self.session.close()
    }
}

// ── Tests ────────────────────────────────────────────────────────
