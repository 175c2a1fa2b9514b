//! Monitoring Session Controller
//!
//! Orchestrates the presence/attention pipeline: camera permission
//! lifecycle, detector selection (model with heuristic fallback), the
//! fixed-cadence sampling loop, debounced violation delivery, and the final
//! session report. The controller exclusively owns all per-session mutable
//! state; nothing survives a session boundary except loaded model weights.

pub mod config;
pub mod session;

pub use config::SessionConfig;
pub use session::{MonitorEvent, MonitoringSession, SessionState};

use camera_stream::CameraError;
use thiserror::Error;

/// Controller error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("A monitoring session is already active")]
    AlreadyActive,

    #[error(transparent)]
    Camera(#[from] CameraError),
}
