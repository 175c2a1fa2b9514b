//! Detection data model shared by both strategies

use serde::{Deserialize, Serialize};

/// 2D point in frame pixel coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned bounding box in frame pixel coordinates
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Box centroid
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Geometric-mean side length, a proxy for distance from camera
    pub fn size(&self) -> f32 {
        (self.width * self.height).sqrt()
    }
}

/// Facial landmark set. Eye contours follow the six-point EAR convention:
/// index 0 = outer corner, 3 = inner corner, 1/2 = upper lid, 4/5 = lower lid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub left_eye: [Point; 6],
    pub right_eye: [Point; 6],
    pub nose_tip: Point,
    pub chin: Point,
}

impl FaceLandmarks {
    /// Midpoint between the two eye centers
    pub fn eye_midpoint(&self) -> Point {
        let left = self.eye_center(&self.left_eye);
        let right = self.eye_center(&self.right_eye);
        Point::new((left.x + right.x) / 2.0, (left.y + right.y) / 2.0)
    }

    /// Distance between the two eye centers
    pub fn inter_eye_distance(&self) -> f32 {
        self.eye_center(&self.left_eye)
            .distance(&self.eye_center(&self.right_eye))
    }

    fn eye_center(&self, eye: &[Point; 6]) -> Point {
        let (mut x, mut y) = (0.0, 0.0);
        for p in eye {
            x += p.x;
            y += p.y;
        }
        Point::new(x / 6.0, y / 6.0)
    }
}

/// A detected face
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    pub bbox: BoundingBox,
    /// Detection confidence (0-1)
    pub confidence: f32,
    /// Landmark set when the strategy provides one; `None` means pose and
    /// eye measurements are unknown for this face
    pub landmarks: Option<FaceLandmarks>,
}

/// Electronic device classes disallowed during a monitored session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceClass {
    Phone,
    Laptop,
    Tablet,
    Monitor,
    Keyboard,
    Remote,
    Mouse,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Phone => "phone",
            DeviceClass::Laptop => "laptop",
            DeviceClass::Tablet => "tablet",
            DeviceClass::Monitor => "monitor",
            DeviceClass::Keyboard => "keyboard",
            DeviceClass::Remote => "remote",
            DeviceClass::Mouse => "mouse",
        }
    }

    /// Map a detector class index to a disallowed device, if it is one
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(DeviceClass::Phone),
            1 => Some(DeviceClass::Laptop),
            2 => Some(DeviceClass::Tablet),
            3 => Some(DeviceClass::Monitor),
            4 => Some(DeviceClass::Keyboard),
            5 => Some(DeviceClass::Remote),
            6 => Some(DeviceClass::Mouse),
            _ => None,
        }
    }
}

/// A detected disallowed object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedObject {
    pub class: DeviceClass,
    /// Detection confidence (0-1)
    pub confidence: f32,
}

/// Per-frame detection result, produced fresh every sample tick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Detection {
    pub faces: Vec<Face>,
    pub objects: Vec<DetectedObject>,
}

impl Detection {
    /// The most confident face, if any
    pub fn primary_face(&self) -> Option<&Face> {
        self.faces
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}
