//! The capture loop.
//!
//! Drives a [`FrameSource`] and pushes every color frame through
//! encode → upload, one frame at a time:
//!
//! ```text
//!  Idle ──open/start──► Streaming ──shutdown / exhausted / limit──► Stopping ──stop/close──► Terminated
//! ```
//!
//! Frames are handled inline on the loop's task. A slow upload delays
//! the next capture; there is no queue and no worker pool. The shutdown
//! flag is checked once per iteration, so a frame that is already being
//! uploaded always finishes first.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::bitmap::BitmapEncoder;
use crate::error::DepthcastError;
use crate::frame::{FrameEvent, FrameKind, RawFrame};
use crate::source::FrameSource;
use crate::stats::UploadStats;
use crate::upload::{Upload, UploadResult};

// ── ShutdownHandle ───────────────────────────────────────────────

/// Cloneable stop request shared with signal handlers.
///
/// Setting it is a single relaxed store: safe to do from any context,
/// observed by the loop at its next iteration.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop after the current frame.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }

    /// Resolves once a stop has been requested.
    pub async fn wait(&self) {
        while !self.is_requested() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

// ── State / Dispatch ─────────────────────────────────────────────

/// Where the loop is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Streaming,
    Stopping,
    Terminated,
}

/// Whether a delivered frame was acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Encoded and an upload was attempted.
    Handled,
    /// Dropped without an upload (depth frames, malformed frames).
    Ignored,
}

/// Why the loop left the Streaming state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    SourceExhausted,
    FrameLimit,
}

// ── LoopConfig ───────────────────────────────────────────────────

/// Tuning for [`CaptureLoop`].
#[derive(Debug, Clone, Default)]
pub struct LoopConfig {
    /// Stop after this many upload attempts. Color frames dropped as
    /// malformed before an upload do not count.
    pub frame_limit: Option<u64>,
}

// ── CaptureSummary ───────────────────────────────────────────────

/// Totals for one run of the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSummary {
    pub stop_reason: StopReason,
    pub color_frames: u64,
    pub depth_frames: u64,
    pub uploaded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub bytes_uploaded: u64,
}

// ── CaptureLoop ──────────────────────────────────────────────────

/// Single-threaded capture → encode → upload pipeline.
pub struct CaptureLoop<S, U> {
    source: S,
    uploader: U,
    encoder: BitmapEncoder,
    stats: UploadStats,
    shutdown: ShutdownHandle,
    config: LoopConfig,
    state: CaptureState,
    color_frames: u64,
    depth_frames: u64,
}

impl<S: FrameSource, U: Upload> CaptureLoop<S, U> {
    pub fn new(source: S, uploader: U, shutdown: ShutdownHandle) -> Self {
        Self::with_config(source, uploader, shutdown, LoopConfig::default())
    }

    pub fn with_config(
        source: S,
        uploader: U,
        shutdown: ShutdownHandle,
        config: LoopConfig,
    ) -> Self {
        Self {
            source,
            uploader,
            encoder: BitmapEncoder::new(),
            stats: UploadStats::new(),
            shutdown,
            config,
            state: CaptureState::Idle,
            color_frames: 0,
            depth_frames: 0,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn stats(&self) -> &UploadStats {
        &self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// A handle that stops this loop when set.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Run the full life cycle: open and start the source, stream until
    /// told to stop, then stop and close the source.
    ///
    /// Device failures and fatal pipeline errors are returned; failed
    /// uploads are not.
    pub async fn run(&mut self) -> Result<CaptureSummary, DepthcastError> {
        // ── Idle → Streaming ────────────────────────────────────
        self.source.open()?;
        debug!(source = self.source.name(), "device opened");
        if let Err(e) = self.source.start() {
            if let Err(close_err) = self.source.close() {
                warn!("close after failed start: {close_err}");
            }
            self.state = CaptureState::Terminated;
            return Err(e);
        }
        self.state = CaptureState::Streaming;
        info!(
            source = self.source.name(),
            target = %self.uploader.target(),
            "streams started"
        );

        // ── Streaming ───────────────────────────────────────────
        let streamed = self.stream().await;

        // ── Stopping → Terminated ───────────────────────────────
        self.state = CaptureState::Stopping;
        let stopped = self.source.stop();
        let closed = self.source.close();
        self.state = CaptureState::Terminated;

        let stop_reason = streamed?;
        stopped?;
        closed?;

        let summary = self.summary(stop_reason);
        info!(
            reason = ?summary.stop_reason,
            color = summary.color_frames,
            uploaded = summary.uploaded,
            failed = summary.failed,
            skipped = summary.skipped,
            avg_bps = self.stats.average_bps(),
            recent_bps = self.stats.recent_bps(),
            "capture finished"
        );
        Ok(summary)
    }

    /// Handle a single delivered frame.
    ///
    /// Depth frames are acknowledged and dropped. Color frames are
    /// encoded and uploaded before this returns.
    pub async fn handle_event(&mut self, event: FrameEvent) -> Result<Dispatch, DepthcastError> {
        match event.kind {
            FrameKind::Depth => {
                self.depth_frames += 1;
                Ok(Dispatch::Ignored)
            }
            FrameKind::Color => self.handle_color(&event.frame).await,
        }
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn stream(&mut self) -> Result<StopReason, DepthcastError> {
        loop {
            if self.shutdown.is_requested() {
                info!("shutdown requested");
                return Ok(StopReason::Shutdown);
            }
            if let Some(limit) = self.config.frame_limit {
                if self.upload_attempts() >= limit {
                    info!(limit, "frame limit reached");
                    return Ok(StopReason::FrameLimit);
                }
            }

            let next = tokio::select! {
                ev = self.source.next_event() => ev?,
                _ = self.shutdown.wait() => continue,
            };
            let Some(event) = next else {
                info!("source exhausted");
                return Ok(StopReason::SourceExhausted);
            };

            self.handle_event(event).await?;
        }
    }

    async fn handle_color(&mut self, frame: &RawFrame) -> Result<Dispatch, DepthcastError> {
        let frame_number = self.color_frames;
        self.color_frames += 1;

        let bmp = match self.encoder.encode(frame) {
            Ok(bmp) => bmp,
            Err(e) if !e.is_fatal() => {
                warn!(frame = frame_number, "dropping frame: {e}");
                self.stats.record_skipped();
                return Ok(Dispatch::Ignored);
            }
            Err(e) => {
                error!(frame = frame_number, "encoder failure: {e}");
                return Err(e);
            }
        };

        let size = u64::from(bmp.file_size());
        let result = self.uploader.upload(bmp.into_reader(), size).await;
        self.log_result(frame_number, &result);
        self.stats.record(&result);
        Ok(Dispatch::Handled)
    }

    fn log_result(&self, frame_number: u64, result: &UploadResult) {
        if result.success {
            info!(
                frame = frame_number,
                bytes = result.bytes,
                "Speed: {:.3} bytes per second during {:.3} seconds.",
                result.bytes_per_second,
                result.elapsed_seconds
            );
        } else if result.is_connect_failure() {
            error!(
                frame = frame_number,
                "Failure: Could not connect to {}",
                self.uploader.target()
            );
        } else {
            error!(
                frame = frame_number,
                "Failure: {}",
                result.failure_reason.as_deref().unwrap_or("unknown error")
            );
        }
    }

    fn upload_attempts(&self) -> u64 {
        self.stats.uploaded() + self.stats.failed()
    }

    fn summary(&self, stop_reason: StopReason) -> CaptureSummary {
        CaptureSummary {
            stop_reason,
            color_frames: self.color_frames,
            depth_frames: self.depth_frames,
            uploaded: self.stats.uploaded(),
            failed: self.stats.failed(),
            skipped: self.stats.skipped(),
            bytes_uploaded: self.stats.bytes_uploaded(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
