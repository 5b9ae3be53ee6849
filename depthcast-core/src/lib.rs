//! # depthcast-core
//!
//! Capture pipeline library for streaming depth-camera color frames to
//! a remote collector as bitmap files.
//!
//! ```text
//! FrameSource ──► bitmap::encode ──► MemFile → MemReader ──► Upload (HTTP PUT)
//!      ▲                                                        │
//!      └──────────────── CaptureLoop (one frame at a time) ◄────┘
//! ```
//!
//! This crate contains:
//! - **Frames**: `RawFrame`, `FrameKind`, `FrameEvent`
//! - **Sources**: the `FrameSource` trait, `SyntheticSource`, `ScriptedSource`
//! - **Bitmap**: 24-bit BMP encoder and header codec
//! - **Memfile**: in-memory write buffer frozen into a streaming reader
//! - **Upload**: `Upload` trait and the streaming `HttpUploader`
//! - **Stats**: per-session upload counters and throughput
//! - **Capture**: `CaptureLoop` state machine and `ShutdownHandle`
//! - **Error**: `DepthcastError` — typed, `thiserror`-based error enum

pub mod bitmap;
pub mod capture;
pub mod error;
pub mod frame;
pub mod memfile;
pub mod source;
pub mod stats;
pub mod upload;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use bitmap::{BitmapEncoder, BitmapFile, BitmapHeader};
pub use capture::{
    CaptureLoop, CaptureState, CaptureSummary, Dispatch, LoopConfig, ShutdownHandle, StopReason,
};
pub use error::{DepthcastError, DeviceStage};
pub use frame::{FrameEvent, FrameKind, RawFrame};
pub use memfile::{MemFile, MemReader};
pub use source::{FrameSource, ScriptedSource, SyntheticConfig, SyntheticSource};
pub use stats::UploadStats;
pub use upload::{HttpUploader, Upload, UploadResult, UploadTarget};
