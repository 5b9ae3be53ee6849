//! Producer service core logic.
//!
//! Wires the configured frame source and collector into a
//! [`CaptureLoop`] and runs it until shutdown.

use tracing::info;

use depthcast_core::{
    CaptureLoop, CaptureSummary, DepthcastError, HttpUploader, ShutdownHandle, SyntheticSource,
};

use crate::config::ProducerConfig;

// ── ProducerService ──────────────────────────────────────────────

/// The top-level producer service.
///
/// Owns the configuration and the shutdown flag; the capture loop and
/// its collaborators are built fresh by [`run`](Self::run).
pub struct ProducerService {
    config: ProducerConfig,
    shutdown: ShutdownHandle,
}

impl ProducerService {
    /// Create a new producer with the given config.
    pub fn new(config: ProducerConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Obtain a handle that can be used to stop the service from a
    /// signal listener or another task.
    pub fn stop_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the service to stop after the current frame.
    pub fn stop(&self) {
        self.shutdown.request();
    }

    pub fn is_stopping(&self) -> bool {
        self.shutdown.is_requested()
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// Run the capture pipeline until it stops.
    ///
    /// 1. Builds the HTTP uploader for the configured collector.
    /// 2. Opens and starts the frame source.
    /// 3. Streams color frames until shutdown, frame limit, or source end.
    /// 4. Stops and closes the source.
    pub async fn run(&self) -> Result<CaptureSummary, DepthcastError> {
        let uploader = HttpUploader::new(self.config.to_target())?;
        info!("uploading to {}", uploader.url());

        let source = SyntheticSource::new(self.config.to_synthetic_config());
        let mut capture = CaptureLoop::with_config(
            source,
            uploader,
            self.shutdown.clone(),
            self.config.to_loop_config(),
        );

        let summary = capture.run().await?;
        info!("producer stopped");
        Ok(summary)
    }
}

// ── Tests ────────────────────────────────────────────────────────
