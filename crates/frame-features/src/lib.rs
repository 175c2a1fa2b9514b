//! Frame Feature Extraction
//!
//! Derives per-frame scalar features from a detection: eye aspect ratio
//! (blink proxy), head pose angles from landmark geometry, face size, and
//! bounding-box centroid. Pure functions of one detection; no state.

mod features;
mod geometry;

pub use features::{extract, FrameFeatures};
pub use geometry::{eye_aspect_ratio, head_pose_from_landmarks, HeadPose};
