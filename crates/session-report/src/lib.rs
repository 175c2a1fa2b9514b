//! Session Aggregation and Reporting
//!
//! Accumulates a bounded rolling history of per-frame measurements plus the
//! session's violation log, and turns them into a scored report with
//! deterministic recommendations when the session ends.

mod aggregator;
mod history;
mod report;

pub use aggregator::{AggregatorConfig, SessionAggregator};
pub use report::{EyeStats, HeadPoseStats, MonitoringReport, ViolationCounts};

use frame_features::FrameFeatures;
use serde::{Deserialize, Serialize};

/// One retained measurement per successful detection cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Milliseconds since session start
    pub timestamp_ms: u64,
    pub face_count: usize,
    /// Primary-face confidence (0-1), 0 when no face
    pub confidence: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    /// 0 means the eyes were not measured this frame
    pub eye_aspect_ratio: f32,
}

impl FrameRecord {
    pub fn from_features(features: &FrameFeatures, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            face_count: features.face_count,
            confidence: features.confidence,
            yaw: features.head_pose.yaw,
            pitch: features.head_pose.pitch,
            roll: features.head_pose.roll,
            eye_aspect_ratio: features.eye_aspect_ratio,
        }
    }
}
