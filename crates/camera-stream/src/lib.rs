//! Camera Stream Library
//!
//! Provides webcam frame sampling for the monitoring pipeline:
//! - Camera permission lifecycle (request, denial, release)
//! - Fixed-cadence frame access through a pluggable device port
//! - Deterministic synthetic camera for tests

pub mod frame;
pub mod sampler;

pub use frame::VideoFrame;
pub use sampler::{CameraDevice, FrameSampler, SamplerState, SyntheticCamera};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    /// The user denied camera access. Terminal for the session; requires an
    /// explicit manual retry, never an automatic one.
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Camera not started")]
    NotStarted,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Sampling period between detection ticks (milliseconds)
    pub sample_interval_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            sample_interval_ms: 900,
        }
    }
}
