//! Confirmation-counter / cooldown state machine
//!
//! Raw per-frame detection is noisy: lighting flicker, a momentary glance, or
//! detector jitter all flip predicates for a frame or two. Each kind therefore
//! accumulates consecutive confirmations and respects a minimum inter-emission
//! cooldown before anything reaches the caller.

use crate::rules::{ClassifierConfig, Severity, ViolationKind, ViolationRecord};
use face_detection::Point;
use frame_features::FrameFeatures;
use tracing::{debug, info};

/// Per-kind debounce state
#[derive(Debug, Clone, Copy, Default)]
struct ConfirmationState {
    /// Consecutive frames the predicate has held
    count: u32,
    last_emitted_ms: Option<u64>,
}

/// Per-session violation classifier. All state lives on the instance; a new
/// session gets a fresh classifier (or a `reset()`), never shared globals.
pub struct ViolationClassifier {
    config: ClassifierConfig,
    states: [ConfirmationState; 6],
    last_centroid: Option<Point>,
}

impl ViolationClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            states: [ConfirmationState::default(); 6],
            last_centroid: None,
        }
    }

    /// Restore session-start state
    pub fn reset(&mut self) {
        self.states = [ConfirmationState::default(); 6];
        self.last_centroid = None;
    }

    /// Evaluate one frame's features. Returns the violations that fire on
    /// this frame, in fixed kind order; at most one per kind.
    pub fn evaluate(&mut self, features: &FrameFeatures, now_ms: u64) -> Vec<ViolationRecord> {
        let face_present = features.face_count > 0;
        let pose = &features.head_pose;

        let looking_away = face_present
            && features.has_landmarks
            && (pose.yaw.abs() > self.config.yaw_limit_deg
                || pose.pitch < self.config.pitch_min_deg
                || pose.pitch > self.config.pitch_max_deg);

        let obscured = face_present
            && features.face_size > 0.0
            && features.face_size < self.config.min_face_size;

        let moved = match (self.last_centroid, features.centroid) {
            (Some(prev), Some(curr)) => prev.distance(&curr) > self.config.movement_limit_px,
            _ => false,
        };
        self.last_centroid = features.centroid;

        let device = features.device_count > 0;
        // Low-confidence device flags (the heuristic's bright-spot guesses)
        // warn rather than alarm
        let device_severity = if features.max_device_confidence >= self.config.device_high_confidence
        {
            Severity::High
        } else {
            Severity::Medium
        };

        let checks = [
            (ViolationKind::FaceNotDetected, !face_present, None, 0.0),
            (ViolationKind::MultipleFaces, features.face_count > 1, None, features.confidence),
            (ViolationKind::LookingAway, looking_away, None, features.confidence),
            (ViolationKind::FaceObscured, obscured, None, features.confidence),
            (ViolationKind::SuspiciousMovement, moved, None, features.confidence),
            (
                ViolationKind::ElectronicDevice,
                device,
                Some(device_severity),
                features.max_device_confidence,
            ),
        ];

        let mut emitted = Vec::new();
        for (kind, active, severity_override, confidence) in checks {
            self.step(kind, active, severity_override, confidence, now_ms, &mut emitted);
        }
        emitted
    }

    fn step(
        &mut self,
        kind: ViolationKind,
        active: bool,
        severity_override: Option<Severity>,
        confidence: f32,
        now_ms: u64,
        out: &mut Vec<ViolationRecord>,
    ) {
        let rule = *self.config.rule(kind);
        let state = &mut self.states[kind.index()];

        if !active {
            // No partial credit across gaps
            state.count = 0;
            return;
        }

        state.count += 1;
        if state.count < rule.required_confirmations {
            debug!(
                "{}: {}/{} confirmations",
                kind.as_str(),
                state.count,
                rule.required_confirmations
            );
            return;
        }

        let cooled = state
            .last_emitted_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= rule.cooldown_ms);
        if !cooled {
            return;
        }

        state.count = 0;
        state.last_emitted_ms = Some(now_ms);
        let severity = severity_override.unwrap_or(rule.severity);
        info!("violation: {} ({:?}) at {}ms", kind.as_str(), severity, now_ms);
        out.push(ViolationRecord {
            kind,
            severity,
            timestamp_ms: now_ms,
            confidence,
        });
    }
}
