//! # depthcast-producer — Frame Producer Service
//!
//! Captures color frames from the depth camera, encodes each as a
//! 24-bit bitmap and streams it to a collector with one HTTP upload per
//! frame. Depth frames are received and discarded.
//!
//! Runs in the foreground until SIGINT, SIGTERM or SIGQUIT, a frame
//! limit, or the end of the source.

pub mod cli;
pub mod config;
pub mod service;
pub mod signals;
