//! Violation kinds, severities, and the per-kind rule table

use serde::{Deserialize, Serialize};

/// Proctoring violation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// No face in frame
    FaceNotDetected,
    /// More than one person visible
    MultipleFaces,
    /// Gaze away from the screen
    LookingAway,
    /// Face too small or partially covered
    FaceObscured,
    /// Rapid repeated position changes
    SuspiciousMovement,
    /// Disallowed electronic device in frame
    ElectronicDevice,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 6] = [
        ViolationKind::FaceNotDetected,
        ViolationKind::MultipleFaces,
        ViolationKind::LookingAway,
        ViolationKind::FaceObscured,
        ViolationKind::SuspiciousMovement,
        ViolationKind::ElectronicDevice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::FaceNotDetected => "face_not_detected",
            ViolationKind::MultipleFaces => "multiple_faces",
            ViolationKind::LookingAway => "looking_away",
            ViolationKind::FaceObscured => "face_obscured",
            ViolationKind::SuspiciousMovement => "suspicious_movement",
            ViolationKind::ElectronicDevice => "electronic_device",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

/// Violation severity. High surfaces as a prominent alert, medium as a soft
/// warning, low is recorded without interrupting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One debounced violation event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub kind: ViolationKind,
    pub severity: Severity,
    /// Milliseconds since session start
    pub timestamp_ms: u64,
    /// Detection confidence behind the event, 0 when not applicable
    pub confidence: f32,
}

/// Debounce discipline for one violation kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KindRule {
    /// Consecutive confirming frames required before firing
    pub required_confirmations: u32,
    /// Minimum time between two emissions of this kind (milliseconds)
    pub cooldown_ms: u64,
    pub severity: Severity,
}

/// Predicate thresholds plus the per-kind rule table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Yaw magnitude beyond which the candidate is looking away (degrees)
    pub yaw_limit_deg: f32,
    /// Acceptable pitch window (degrees); outside it counts as looking away
    pub pitch_min_deg: f32,
    pub pitch_max_deg: f32,
    /// Face-size floor below which the face reads as obscured/too far
    pub min_face_size: f32,
    /// Centroid travel between consecutive frames marking movement (pixels)
    pub movement_limit_px: f32,
    /// Device confidence at or above which severity escalates to high
    pub device_high_confidence: f32,

    pub face_not_detected: KindRule,
    pub multiple_faces: KindRule,
    pub looking_away: KindRule,
    pub face_obscured: KindRule,
    pub suspicious_movement: KindRule,
    pub electronic_device: KindRule,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            yaw_limit_deg: 15.0,
            pitch_min_deg: 5.0,
            pitch_max_deg: 20.0,
            min_face_size: 200.0,
            movement_limit_px: 50.0,
            device_high_confidence: 0.8,
            face_not_detected: KindRule {
                required_confirmations: 2,
                cooldown_ms: 5_000,
                severity: Severity::High,
            },
            multiple_faces: KindRule {
                required_confirmations: 3,
                cooldown_ms: 8_000,
                severity: Severity::High,
            },
            looking_away: KindRule {
                required_confirmations: 1,
                cooldown_ms: 5_000,
                severity: Severity::Medium,
            },
            face_obscured: KindRule {
                required_confirmations: 1,
                cooldown_ms: 5_000,
                severity: Severity::Medium,
            },
            suspicious_movement: KindRule {
                required_confirmations: 5,
                cooldown_ms: 10_000,
                severity: Severity::Low,
            },
            electronic_device: KindRule {
                required_confirmations: 3,
                cooldown_ms: 10_000,
                severity: Severity::High,
            },
        }
    }
}

impl ClassifierConfig {
    pub fn rule(&self, kind: ViolationKind) -> &KindRule {
        match kind {
            ViolationKind::FaceNotDetected => &self.face_not_detected,
            ViolationKind::MultipleFaces => &self.multiple_faces,
            ViolationKind::LookingAway => &self.looking_away,
            ViolationKind::FaceObscured => &self.face_obscured,
            ViolationKind::SuspiciousMovement => &self.suspicious_movement,
            ViolationKind::ElectronicDevice => &self.electronic_device,
        }
    }

    /// Stricter thresholds, faster firing
    pub fn strict() -> Self {
        Self {
            yaw_limit_deg: 10.0,
            face_not_detected: KindRule {
                required_confirmations: 1,
                cooldown_ms: 3_000,
                severity: Severity::High,
            },
            electronic_device: KindRule {
                required_confirmations: 2,
                cooldown_ms: 8_000,
                severity: Severity::High,
            },
            ..Default::default()
        }
    }

    /// Looser thresholds for poor cameras or lighting
    pub fn lenient() -> Self {
        Self {
            yaw_limit_deg: 25.0,
            pitch_min_deg: 0.0,
            pitch_max_deg: 30.0,
            min_face_size: 120.0,
            face_not_detected: KindRule {
                required_confirmations: 4,
                cooldown_ms: 8_000,
                severity: Severity::High,
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_string_names() {
        assert_eq!(ViolationKind::FaceNotDetected.as_str(), "face_not_detected");
        assert_eq!(ViolationKind::ElectronicDevice.as_str(), "electronic_device");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_default_rule_table_relationships() {
        let config = ClassifierConfig::default();
        // Multiple-faces debounces harder than face-absence
        assert!(
            config.multiple_faces.required_confirmations
                > config.face_not_detected.required_confirmations
        );
        // Looking-away fires immediately, relying on its own cooldown
        assert_eq!(config.looking_away.required_confirmations, 1);
        // Movement accumulates the longest before firing
        assert_eq!(config.suspicious_movement.required_confirmations, 5);
    }
}
