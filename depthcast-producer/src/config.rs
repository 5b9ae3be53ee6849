//! Configuration for the producer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use depthcast_core::{LoopConfig, SyntheticConfig, UploadTarget};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Where frames are uploaded.
    pub collector: CollectorConfig,
    /// Frame source settings.
    pub source: SourceConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Collector destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Host name, IP address, or full `http://` URL.
    pub host: String,
    /// Destination port.
    pub port: u16,
    /// Request path when `host` is a bare host.
    pub path: String,
}

/// Frame source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Color frame width in pixels.
    pub width: u32,
    /// Color frame height in pixels.
    pub height: u32,
    /// Color frames per second.
    pub fps: u32,
    /// Deliver depth frames alongside color (they are discarded).
    pub depth_enabled: bool,
    /// Stop after this many upload attempts (0 = run until signalled).
    pub frame_limit: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            host: UploadTarget::DEFAULT_HOST.into(),
            port: UploadTarget::DEFAULT_PORT,
            path: "/".into(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        let synthetic = SyntheticConfig::default();
        Self {
            width: synthetic.width,
            height: synthetic.height,
            fps: synthetic.fps,
            depth_enabled: synthetic.depth_enabled,
            frame_limit: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ProducerConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Override the collector destination (positional `HOST PORT`).
    pub fn set_destination(&mut self, host: impl Into<String>, port: u16) {
        self.collector.host = host.into();
        self.collector.port = port;
    }

    /// The upload destination.
    pub fn to_target(&self) -> UploadTarget {
        UploadTarget::new(self.collector.host.clone(), self.collector.port)
            .with_path(self.collector.path.clone())
    }

    /// Synthetic source settings, with the rate clamped to 1..=60 fps.
    pub fn to_synthetic_config(&self) -> SyntheticConfig {
        SyntheticConfig {
            width: self.source.width,
            height: self.source.height,
            fps: self.source.fps.clamp(1, 60),
            depth_enabled: self.source.depth_enabled,
        }
    }

    pub fn to_loop_config(&self) -> LoopConfig {
        LoopConfig {
            frame_limit: (self.source.frame_limit > 0).then_some(self.source.frame_limit),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
