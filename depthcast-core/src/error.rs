//! Domain-specific error types for the capture pipeline.
//!
//! All fallible pipeline operations return `Result<T, DepthcastError>`.
//! Upload outcomes are *not* errors: a failed upload is reported as an
//! [`UploadResult`](crate::upload::UploadResult) and the loop moves on.

use thiserror::Error;

/// The canonical error type for depthcast.
#[derive(Debug, Error)]
pub enum DepthcastError {
    // ── Frame Errors ─────────────────────────────────────────────
    /// A frame's geometry or buffer length is not encodable.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    // ── Encoding Errors ──────────────────────────────────────────
    /// The output buffer for an encoded frame could not be allocated.
    #[error("could not allocate {size} bytes for encoded frame")]
    Allocation { size: usize },

    /// Writing into or reading from an in-memory file failed.
    #[error("in-memory file error: {0}")]
    Io(#[from] std::io::Error),

    /// A bitmap header could not be parsed.
    #[error("invalid bitmap header: {0}")]
    InvalidBitmap(&'static str),

    // ── Device Errors ────────────────────────────────────────────
    /// The frame source failed during a session life-cycle step.
    #[error("device {stage} failed: {reason}")]
    Device { stage: DeviceStage, reason: String },

    // ── Transport Errors ─────────────────────────────────────────
    /// The destination could not be turned into a request URL.
    #[error("invalid upload target: {0}")]
    InvalidTarget(String),

    /// The HTTP client could not be constructed.
    #[error("transport setup failed: {0}")]
    Transport(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl DepthcastError {
    /// Whether the capture loop must stop on this error.
    ///
    /// Only a malformed frame is survivable; it is skipped without an
    /// upload attempt.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DepthcastError::InvalidFrame(_))
    }

    /// Shorthand for a [`DepthcastError::Device`] error.
    pub fn device(stage: DeviceStage, reason: impl Into<String>) -> Self {
        DepthcastError::Device {
            stage,
            reason: reason.into(),
        }
    }
}

// ── DeviceStage ──────────────────────────────────────────────────

/// Life-cycle step of a frame source session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStage {
    Open,
    Start,
    Receive,
    Stop,
    Close,
}

impl std::fmt::Display for DeviceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeviceStage::Open => "open",
            DeviceStage::Start => "start",
            DeviceStage::Receive => "receive",
            DeviceStage::Stop => "stop",
            DeviceStage::Close => "close",
        };
        f.write_str(s)
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for DepthcastError {
    fn from(s: String) -> Self {
        DepthcastError::Other(s)
    }
}

impl From<&str> for DepthcastError {
    fn from(s: &str) -> Self {
        DepthcastError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = DepthcastError::Allocation { size: 921_654 };
        assert!(e.to_string().contains("921654"));

        let e = DepthcastError::device(DeviceStage::Start, "usb stall");
        assert_eq!(e.to_string(), "device start failed: usb stall");
    }

    #[test]
    fn only_invalid_frames_are_survivable() {
        assert!(!DepthcastError::InvalidFrame("zero width".into()).is_fatal());
        assert!(DepthcastError::Allocation { size: 1 }.is_fatal());
        assert!(DepthcastError::device(DeviceStage::Receive, "gone").is_fatal());
    }

    #[test]
    fn from_string() {
        let e: DepthcastError = "something broke".into();
        assert!(matches!(e, DepthcastError::Other(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::WriteZero, "short write");
        let e: DepthcastError = io_err.into();
        assert!(matches!(e, DepthcastError::Io(_)));
    }
}
