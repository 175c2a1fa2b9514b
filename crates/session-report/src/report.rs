//! Final session report and recommendation rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use violation_engine::{ViolationKind, ViolationRecord};

/// Per-kind violation counts for the session
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ViolationCounts {
    pub face_not_detected: usize,
    pub multiple_faces: usize,
    pub looking_away: usize,
    pub face_obscured: usize,
    pub suspicious_movement: usize,
    pub electronic_device: usize,
}

impl ViolationCounts {
    pub fn increment(&mut self, kind: ViolationKind) {
        match kind {
            ViolationKind::FaceNotDetected => self.face_not_detected += 1,
            ViolationKind::MultipleFaces => self.multiple_faces += 1,
            ViolationKind::LookingAway => self.looking_away += 1,
            ViolationKind::FaceObscured => self.face_obscured += 1,
            ViolationKind::SuspiciousMovement => self.suspicious_movement += 1,
            ViolationKind::ElectronicDevice => self.electronic_device += 1,
        }
    }

    pub fn get(&self, kind: ViolationKind) -> usize {
        match kind {
            ViolationKind::FaceNotDetected => self.face_not_detected,
            ViolationKind::MultipleFaces => self.multiple_faces,
            ViolationKind::LookingAway => self.looking_away,
            ViolationKind::FaceObscured => self.face_obscured,
            ViolationKind::SuspiciousMovement => self.suspicious_movement,
            ViolationKind::ElectronicDevice => self.electronic_device,
        }
    }

    pub fn total(&self) -> usize {
        ViolationKind::ALL.iter().map(|k| self.get(*k)).sum()
    }
}

/// Head-pose statistics over the retained frame history
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HeadPoseStats {
    pub mean_yaw: f32,
    pub mean_pitch: f32,
    pub mean_roll: f32,
    pub max_yaw_deviation: f32,
    pub max_pitch_deviation: f32,
}

/// Eye-movement statistics. Means cover only frames where the eyes were
/// actually measured (EAR > 0).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EyeStats {
    pub mean_ear: f32,
    /// Share of measured frames with eyes closed (EAR below the blink
    /// threshold)
    pub eyes_closed_ratio: f32,
    pub blink_count: usize,
    pub blink_rate_per_min: f32,
}

/// Immutable end-of-session report, handed to the caller as a plain
/// serializable object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringReport {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub session_duration_s: f64,
    /// Frames recorded over the whole session (not just the retained window)
    pub total_detections: usize,
    pub average_confidence: f32,
    /// Frames with a face / total frames, percent
    pub face_detection_rate: f32,
    /// Detected frames per wall-clock second, percent, capped at 100
    pub presence_rate: f32,
    pub head_pose: HeadPoseStats,
    pub eyes: EyeStats,
    pub violations: ViolationCounts,
    pub violation_log: Vec<ViolationRecord>,
    pub attention_score: f32,
    pub stability_score: f32,
    pub overall_score: f32,
    pub recommendations: Vec<String>,
}

/// Sessions shorter than this have meaningless blink rates
const MIN_BLINK_EVAL_S: f64 = 10.0;

/// Rule-based session feedback. Deterministic for a given set of aggregates;
/// an empty rule set collapses to a single positive message.
pub(crate) fn build_recommendations(
    has_data: bool,
    session_duration_s: f64,
    face_detection_rate: f32,
    counts: &ViolationCounts,
    eyes: &EyeStats,
    attention_score: f32,
) -> Vec<String> {
    if !has_data {
        return vec!["No monitoring data was collected during this session.".to_string()];
    }

    let mut tips = Vec::new();
    if face_detection_rate < 90.0 {
        tips.push(
            "Your face was hard to detect at times. Improve the lighting and keep your face centered in the camera view."
                .to_string(),
        );
    }
    if counts.face_not_detected > 0 {
        tips.push("Stay in frame for the whole answer; the camera lost sight of you.".to_string());
    }
    if counts.looking_away > 2 {
        tips.push(
            "Try to maintain eye contact with the camera instead of looking off-screen."
                .to_string(),
        );
    }
    if counts.multiple_faces > 0 {
        tips.push("Find a private room; another person appeared on camera.".to_string());
    }
    if counts.electronic_device > 0 {
        tips.push("Remove phones and other screens from view during the interview.".to_string());
    }
    let blink_rate_meaningful = eyes.mean_ear > 0.0 && session_duration_s >= MIN_BLINK_EVAL_S;
    if blink_rate_meaningful && eyes.blink_rate_per_min < 10.0 {
        tips.push(
            "You blinked less than usual, which often signals screen strain. Remember to relax your eyes."
                .to_string(),
        );
    }
    if blink_rate_meaningful && eyes.blink_rate_per_min > 30.0 {
        tips.push(
            "A high blink rate can read as nervousness. Take a breath and slow down."
                .to_string(),
        );
    }
    if attention_score < 70.0 {
        tips.push("Work on holding a steady, forward-facing posture to appear more engaged.".to_string());
    }

    if tips.is_empty() {
        tips.push("Great camera presence. Keep it up.".to_string());
    }
    tips
}
