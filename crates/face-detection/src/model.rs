//! Model-based detection strategy
//!
//! Runs two pretrained ONNX models against each sampled frame:
//! - Face model: input `1x3xSxS` RGB normalized to [-1, 1]; outputs `boxes`
//!   `[N, 5]` rows `(cx, cy, w, h, score)` and `landmarks` `[N, 28]` rows of
//!   14 `(x, y)` pairs (six left-eye points, six right-eye points, nose tip,
//!   chin), all normalized to the frame.
//! - Object model: same input; output `detections` `[M, 6]` rows
//!   `(cx, cy, w, h, score, class)`, class indices mapped through
//!   [`DeviceClass::from_index`].

use crate::types::{BoundingBox, DetectedObject, Detection, DeviceClass, Face, FaceLandmarks, Point};
use crate::{DetectError, Detector, DetectorKind};
use camera_stream::VideoFrame;
use ndarray::{Array4, ArrayView1, Ix2};
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Model-based detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the face landmark model
    pub face_model_path: String,
    /// Path to the general object model; `None` disables device detection
    pub object_model_path: Option<String>,
    /// Face detection confidence threshold
    pub face_confidence: f32,
    /// Object detection confidence threshold
    pub object_confidence: f32,
    /// Square model input size
    pub input_size: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_model_path: "assets/face-landmarker.onnx".to_string(),
            object_model_path: Some("assets/object-detector.onnx".to_string()),
            face_confidence: 0.7,
            object_confidence: 0.6,
            input_size: 128,
        }
    }
}

/// Detector backed by pretrained ONNX sessions. The loaded weights are
/// immutable shared state: cloning the detector shares the sessions, so one
/// load serves any number of monitoring sessions.
#[derive(Clone)]
pub struct ModelDetector {
    face_session: Arc<Session>,
    object_session: Option<Arc<Session>>,
    config: ModelConfig,
}

impl ModelDetector {
    /// Load both models. This is a blocking call; use
    /// [`crate::load_with_retry`] for the guarded async path.
    pub fn new(config: ModelConfig) -> Result<Self, DetectError> {
        let face_session = Arc::new(build_session(&config.face_model_path)?);
        let object_session = match &config.object_model_path {
            Some(path) => Some(Arc::new(build_session(path)?)),
            None => {
                warn!("no object model configured; device detection disabled");
                None
            }
        };

        Ok(Self {
            face_session,
            object_session,
            config,
        })
    }

    fn preprocess(&self, frame: &VideoFrame) -> Result<Array4<f32>, DetectError> {
        let img = image::ImageBuffer::<image::Rgb<u8>, _>::from_raw(
            frame.width,
            frame.height,
            frame.data.as_slice(),
        )
        .ok_or_else(|| DetectError::ImageProcessing("frame buffer size mismatch".into()))?;

        let size = self.config.input_size;
        let resized =
            image::imageops::resize(&img, size, size, image::imageops::FilterType::Triangle);

        let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = (pixel[0] as f32 / 127.5) - 1.0;
            input[[0, 1, y as usize, x as usize]] = (pixel[1] as f32 / 127.5) - 1.0;
            input[[0, 2, y as usize, x as usize]] = (pixel[2] as f32 / 127.5) - 1.0;
        }
        Ok(input)
    }

    fn detect_faces(
        &self,
        input: &Array4<f32>,
        frame: &VideoFrame,
    ) -> Result<Vec<Face>, DetectError> {
        let outputs = self
            .face_session
            .run(ort::inputs![input.clone()].map_err(|e| DetectError::Inference(e.to_string()))?)
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let boxes = outputs
            .get("boxes")
            .ok_or_else(|| DetectError::Inference("face model has no `boxes` output".into()))?
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::Inference(e.to_string()))?
            .into_dimensionality::<Ix2>()
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        let landmarks = outputs
            .get("landmarks")
            .ok_or_else(|| DetectError::Inference("face model has no `landmarks` output".into()))?
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::Inference(e.to_string()))?
            .into_dimensionality::<Ix2>()
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let (fw, fh) = (frame.width as f32, frame.height as f32);
        let mut faces = Vec::new();
        for (bx, lm) in boxes.outer_iter().zip(landmarks.outer_iter()) {
            let score = bx[4];
            if score < self.config.face_confidence {
                continue;
            }
            let width = bx[2] * fw;
            let height = bx[3] * fh;
            faces.push(Face {
                bbox: BoundingBox {
                    x: bx[0] * fw - width / 2.0,
                    y: bx[1] * fh - height / 2.0,
                    width,
                    height,
                },
                confidence: score.clamp(0.0, 1.0),
                landmarks: decode_landmarks(lm, fw, fh),
            });
        }
        Ok(faces)
    }

    fn detect_objects(&self, input: &Array4<f32>) -> Result<Vec<DetectedObject>, DetectError> {
        let Some(session) = &self.object_session else {
            return Ok(Vec::new());
        };

        let outputs = session
            .run(ort::inputs![input.clone()].map_err(|e| DetectError::Inference(e.to_string()))?)
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let detections = outputs
            .get("detections")
            .ok_or_else(|| {
                DetectError::Inference("object model has no `detections` output".into())
            })?
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::Inference(e.to_string()))?
            .into_dimensionality::<Ix2>()
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let mut objects = Vec::new();
        for row in detections.outer_iter() {
            let score = row[4];
            if score < self.config.object_confidence {
                continue;
            }
            if let Some(class) = DeviceClass::from_index(row[5] as usize) {
                debug!("disallowed device detected: {} ({:.2})", class.as_str(), score);
                objects.push(DetectedObject {
                    class,
                    confidence: score.clamp(0.0, 1.0),
                });
            }
        }
        Ok(objects)
    }
}

impl Detector for ModelDetector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Detection, DetectError> {
        let input = self.preprocess(frame)?;
        let faces = self.detect_faces(&input, frame)?;
        let objects = self.detect_objects(&input)?;
        Ok(Detection { faces, objects })
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::Model
    }
}

fn build_session(path: &str) -> Result<Session, DetectError> {
    info!("loading detection model from {}", path);
    Session::builder()
        .map_err(|e| DetectError::ModelLoad(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| DetectError::ModelLoad(e.to_string()))?
        .commit_from_file(path)
        .map_err(|e| DetectError::ModelLoad(e.to_string()))
}

fn decode_landmarks(row: ArrayView1<'_, f32>, fw: f32, fh: f32) -> Option<FaceLandmarks> {
    if row.len() < 28 {
        return None;
    }
    let pt = |i: usize| Point::new(row[2 * i] * fw, row[2 * i + 1] * fh);
    Some(FaceLandmarks {
        left_eye: [pt(0), pt(1), pt(2), pt(3), pt(4), pt(5)],
        right_eye: [pt(6), pt(7), pt(8), pt(9), pt(10), pt(11)],
        nose_tip: pt(12),
        chin: pt(13),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn test_decode_landmarks_scales_to_frame() {
        let mut row = vec![0.0f32; 28];
        row[24] = 0.5; // nose x
        row[25] = 0.4; // nose y
        row[26] = 0.5; // chin x
        row[27] = 0.9; // chin y
        let arr = Array1::from(row);
        let lm = decode_landmarks(arr.view(), 640.0, 480.0).unwrap();
        assert!((lm.nose_tip.x - 320.0).abs() < 0.001);
        assert!((lm.nose_tip.y - 192.0).abs() < 0.001);
        assert!((lm.chin.y - 432.0).abs() < 0.001);
    }

    #[test]
    fn test_decode_landmarks_rejects_short_rows() {
        let arr = Array1::from(vec![0.0f32; 10]);
        assert!(decode_landmarks(arr.view(), 640.0, 480.0).is_none());
    }
}
