//! Per-frame feature assembly

use crate::geometry::{average_ear, head_pose_from_landmarks, HeadPose};
use face_detection::{Detection, Point};
use serde::{Deserialize, Serialize};

/// Scalar features derived from one detection.
///
/// When `has_landmarks` is false, `head_pose` and `eye_aspect_ratio` are
/// zeroed and mean "unknown", not "centered/neutral"; downstream rules must
/// not treat them as measurements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameFeatures {
    /// Number of detected faces
    pub face_count: usize,
    /// Primary-face detection confidence, 0 when no face
    pub confidence: f32,
    /// Head pose of the primary face
    pub head_pose: HeadPose,
    /// Average eye aspect ratio of the primary face
    pub eye_aspect_ratio: f32,
    /// Geometric-mean box size of the primary face, 0 when no face
    pub face_size: f32,
    /// Primary-face bounding-box centroid
    pub centroid: Option<Point>,
    /// Whether pose/EAR were actually measured
    pub has_landmarks: bool,
    /// Disallowed electronic devices in frame
    pub device_count: usize,
    /// Highest device-detection confidence, 0 when none
    pub max_device_confidence: f32,
}

/// Extract features from a detection. Pure; missing landmark groups yield
/// zeroed pose/EAR rather than an error.
pub fn extract(detection: &Detection) -> FrameFeatures {
    let mut features = FrameFeatures {
        face_count: detection.faces.len(),
        device_count: detection.objects.len(),
        max_device_confidence: detection
            .objects
            .iter()
            .map(|o| o.confidence)
            .fold(0.0, f32::max),
        ..Default::default()
    };

    if let Some(face) = detection.primary_face() {
        features.confidence = face.confidence;
        features.face_size = face.bbox.size();
        features.centroid = Some(face.bbox.center());

        if let Some(landmarks) = &face.landmarks {
            features.head_pose = head_pose_from_landmarks(landmarks);
            features.eye_aspect_ratio = average_ear(landmarks);
            features.has_landmarks = true;
        }
    }

    features
}
