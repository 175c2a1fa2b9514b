//! Face and Object Detection
//!
//! Turns a sampled video frame into zero or more detected faces (with
//! landmarks and confidence) and zero or more detected electronic devices.
//! Two interchangeable strategies share one output shape:
//! - Model-based: pretrained ONNX landmark + object detectors
//! - Heuristic: grid-sampled brightness/skin/motion analysis
//!
//! Model loading is retried a bounded number of times with a timeout guard;
//! exhaustion tells the caller to fall back to the heuristic strategy.

pub mod heuristic;
pub mod loader;
pub mod model;
pub mod types;

pub use heuristic::{HeuristicConfig, HeuristicDetector};
pub use loader::{load_with_retry, LoadPolicy};
pub use model::{ModelConfig, ModelDetector};
pub use types::{
    BoundingBox, DetectedObject, Detection, DeviceClass, Face, FaceLandmarks, Point,
};

use camera_stream::VideoFrame;
use thiserror::Error;

/// Detection error types
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Model unavailable after {attempts} load attempts")]
    ModelUnavailable { attempts: u32 },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),
}

/// Which detection strategy is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    /// Pretrained landmark + object models
    Model,
    /// Grid-sampled pixel heuristics
    Heuristic,
}

/// A detection strategy. Both implementations produce the same
/// [`Detection`] shape so feature extraction is strategy-agnostic.
/// `detect` runs once per sampling tick and must stay well under the tick
/// period, or the cadence starves.
pub trait Detector: Send {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Detection, DetectError>;

    fn kind(&self) -> DetectorKind;
}
