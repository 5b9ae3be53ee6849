//! Upload statistics for a capture session.
//!
//! Keeps lifetime counters plus a rolling window of successful uploads.
//! Throughput is bytes moved divided by time spent transferring them, so
//! idle time between frames and failed attempts do not dilute it.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::upload::UploadResult;

/// One successful upload inside the rolling window.
#[derive(Debug, Clone, Copy)]
struct Sample {
    finished: Instant,
    bytes: u64,
    elapsed: Duration,
}

/// Session-wide upload counters with a rolling throughput window.
#[derive(Debug)]
pub struct UploadStats {
    samples: VecDeque<Sample>,
    window: Duration,
    window_bytes: u64,
    window_time: Duration,

    uploaded: u64,
    failed: u64,
    connect_failures: u64,
    skipped: u64,
    bytes_uploaded: u64,
    /// Transfer time of successful uploads only.
    upload_time: Duration,
}

impl UploadStats {
    /// Stats with a 5-second rolling window.
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(5))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            samples: VecDeque::with_capacity(64),
            window,
            window_bytes: 0,
            window_time: Duration::ZERO,
            uploaded: 0,
            failed: 0,
            connect_failures: 0,
            skipped: 0,
            bytes_uploaded: 0,
            upload_time: Duration::ZERO,
        }
    }

    /// Record an upload that just finished.
    pub fn record(&mut self, result: &UploadResult) {
        self.record_at(Instant::now(), result);
    }

    /// Record an upload that finished at `finished`.
    pub fn record_at(&mut self, finished: Instant, result: &UploadResult) {
        if result.success {
            let elapsed = Duration::from_secs_f64(result.elapsed_seconds.max(0.0));
            self.uploaded += 1;
            self.bytes_uploaded += result.bytes;
            self.upload_time += elapsed;

            self.samples.push_back(Sample {
                finished,
                bytes: result.bytes,
                elapsed,
            });
            self.window_bytes += result.bytes;
            self.window_time += elapsed;
        } else {
            self.failed += 1;
            if result.is_connect_failure() {
                self.connect_failures += 1;
            }
        }
        self.evict(finished);
    }

    /// A frame was dropped before any upload was attempted.
    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Throughput of the uploads that finished within the window, in
    /// bytes/second.
    pub fn recent_bps(&self) -> u64 {
        bytes_per_second(self.window_bytes, self.window_time)
    }

    /// Mean throughput across every successful upload, in bytes/second.
    pub fn average_bps(&self) -> u64 {
        bytes_per_second(self.bytes_uploaded, self.upload_time)
    }

    pub fn uploaded(&self) -> u64 {
        self.uploaded
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn connect_failures(&self) -> u64 {
        self.connect_failures
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn bytes_uploaded(&self) -> u64 {
        self.bytes_uploaded
    }

    /// Number of uploads currently in the window.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    // ── Internal ─────────────────────────────────────────────────

    fn evict(&mut self, now: Instant) {
        while let Some(sample) = self.samples.front().copied() {
            if now.duration_since(sample.finished) <= self.window {
                break;
            }
            self.samples.pop_front();
            self.window_bytes = self.window_bytes.saturating_sub(sample.bytes);
            self.window_time = self.window_time.saturating_sub(sample.elapsed);
        }
    }
}

impl Default for UploadStats {
    fn default() -> Self {
        Self::new()
    }
}

fn bytes_per_second(bytes: u64, time: Duration) -> u64 {
    let secs = time.as_secs_f64();
    if secs <= 0.0 {
        return 0;
    }
    (bytes as f64 / secs) as u64
}

// ── Tests ────────────────────────────────────────────────────────
