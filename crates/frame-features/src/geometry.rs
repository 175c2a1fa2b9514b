//! Landmark geometry: eye aspect ratio and head pose angles

use face_detection::FaceLandmarks;
use serde::{Deserialize, Serialize};

/// Yaw is scaled so a nose offset of one inter-eye distance maps to the full
/// range; pitch spans the eye-to-chin distance. Angles are clamped, never
/// extrapolated past these ranges.
const YAW_RANGE_DEG: f32 = 60.0;
const PITCH_RANGE_DEG: f32 = 40.0;
const ROLL_RANGE_DEG: f32 = 30.0;

/// Head rotation in degrees: yaw (left-right), pitch (up-down), roll (tilt)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// Six-point eye aspect ratio: `(|p1-p5| + |p2-p4|) / (2 * |p0-p3|)`.
/// Open eyes sit near 0.3; values below ~0.25 read as closed.
pub fn eye_aspect_ratio(eye: &[face_detection::Point; 6]) -> f32 {
    let horizontal = eye[0].distance(&eye[3]);
    if horizontal <= f32::EPSILON {
        return 0.0;
    }
    let v1 = eye[1].distance(&eye[5]);
    let v2 = eye[2].distance(&eye[4]);
    (v1 + v2) / (2.0 * horizontal)
}

/// Average EAR across both eyes
pub fn average_ear(landmarks: &FaceLandmarks) -> f32 {
    (eye_aspect_ratio(&landmarks.left_eye) + eye_aspect_ratio(&landmarks.right_eye)) / 2.0
}

/// Head pose from landmark geometry.
///
/// - yaw: horizontal nose-tip offset from the inter-eye midpoint, normalized
///   by inter-eye distance, scaled to +/-60 degrees
/// - pitch: vertical nose-tip offset within the eye-to-chin span, scaled to
///   +/-40 degrees; a neutral face lands near +10
/// - roll: angle of the inter-eye vector, clamped to +/-30 degrees
pub fn head_pose_from_landmarks(landmarks: &FaceLandmarks) -> HeadPose {
    let eye_mid = landmarks.eye_midpoint();
    let inter_eye = landmarks.inter_eye_distance();

    let yaw = if inter_eye > f32::EPSILON {
        ((landmarks.nose_tip.x - eye_mid.x) / inter_eye * YAW_RANGE_DEG)
            .clamp(-YAW_RANGE_DEG, YAW_RANGE_DEG)
    } else {
        0.0
    };

    let span = landmarks.chin.y - eye_mid.y;
    let pitch = if span.abs() > f32::EPSILON {
        ((landmarks.nose_tip.y - eye_mid.y) / span * PITCH_RANGE_DEG)
            .clamp(-PITCH_RANGE_DEG, PITCH_RANGE_DEG)
    } else {
        0.0
    };

    let left = eye_center(&landmarks.left_eye);
    let right = eye_center(&landmarks.right_eye);
    let roll = (right.y - left.y)
        .atan2(right.x - left.x)
        .to_degrees()
        .clamp(-ROLL_RANGE_DEG, ROLL_RANGE_DEG);

    HeadPose { yaw, pitch, roll }
}

fn eye_center(eye: &[face_detection::Point; 6]) -> face_detection::Point {
    let (mut x, mut y) = (0.0, 0.0);
    for p in eye {
        x += p.x;
        y += p.y;
    }
    face_detection::Point::new(x / 6.0, y / 6.0)
}
