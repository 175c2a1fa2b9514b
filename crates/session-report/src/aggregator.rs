//! Session aggregator
//!
//! Owns the bounded frame/blink history and the violation log for one
//! session, and computes the final report on `finalize`. Score and rate
//! formulas keep the monitored ranges in [0, 100]; the presence rate divides
//! detected frames by wall-clock seconds and therefore carries an explicit
//! cap at 100 (a sampling-vs-wall-clock mismatch can push the raw ratio
//! past it).

use crate::history::History;
use crate::report::{
    build_recommendations, EyeStats, HeadPoseStats, MonitoringReport, ViolationCounts,
};
use crate::FrameRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;
use violation_engine::ViolationRecord;

/// Aggregator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Retained frame records
    pub frame_capacity: usize,
    /// Retained blink timestamps
    pub blink_capacity: usize,
    /// EAR below this counts as eyes closed; a downward crossing is a blink
    pub blink_threshold: f32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            frame_capacity: 100,
            blink_capacity: 50,
            blink_threshold: 0.25,
        }
    }
}

/// Per-session measurement accumulator. One instance per session; `finalize`
/// consumes it, so no working state survives the report.
pub struct SessionAggregator {
    config: AggregatorConfig,
    session_id: Uuid,
    started_at: DateTime<Utc>,
    frames: History<FrameRecord>,
    blinks: History<u64>,
    violation_log: Vec<ViolationRecord>,
    counts: ViolationCounts,
    /// Frames recorded over the whole session, eviction notwithstanding
    total_frames: usize,
    /// Frames with at least one face, over the whole session
    detected_frames: usize,
    blink_total: usize,
    last_ear: f32,
    last_timestamp_ms: Option<u64>,
}

impl SessionAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            frames: History::new(config.frame_capacity),
            blinks: History::new(config.blink_capacity),
            config,
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            violation_log: Vec::new(),
            counts: ViolationCounts::default(),
            total_frames: 0,
            detected_frames: 0,
            blink_total: 0,
            last_ear: f32::MAX,
            last_timestamp_ms: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Record one frame's measurements. Timestamps must be strictly
    /// increasing; a stale frame is dropped.
    pub fn record_frame(&mut self, record: FrameRecord) {
        if let Some(last) = self.last_timestamp_ms {
            if record.timestamp_ms <= last {
                warn!(
                    "dropping out-of-order frame: {} <= {}",
                    record.timestamp_ms, last
                );
                return;
            }
        }
        self.last_timestamp_ms = Some(record.timestamp_ms);

        self.total_frames += 1;
        if record.face_count > 0 {
            self.detected_frames += 1;
        }

        // Blink = downward EAR crossing. EAR 0 means "not measured", so it
        // neither blinks nor moves the reference value.
        let ear = record.eye_aspect_ratio;
        if ear > 0.0 {
            if ear < self.config.blink_threshold && self.last_ear >= self.config.blink_threshold {
                debug!("blink at {}ms (ear {:.3})", record.timestamp_ms, ear);
                self.blinks.push(record.timestamp_ms);
                self.blink_total += 1;
            }
            self.last_ear = ear;
        }

        self.frames.push(record);
    }

    /// Append a debounced violation to the session log
    pub fn record_violation(&mut self, violation: ViolationRecord) {
        self.counts.increment(violation.kind);
        self.violation_log.push(violation);
    }

    /// Build the final report. `now_ms` is elapsed session time; the
    /// aggregator is consumed so the session's working state cannot leak
    /// into a later one.
    pub fn finalize(self, now_ms: u64) -> MonitoringReport {
        if self.total_frames == 0 {
            info!("finalizing session {} with no recorded frames", self.session_id);
            return self.empty_report(now_ms);
        }

        let duration_s = now_ms as f64 / 1000.0;
        let retained = self.frames.len() as f32;

        let average_confidence =
            self.frames.iter().map(|f| f.confidence).sum::<f32>() / retained;

        let head_pose = HeadPoseStats {
            mean_yaw: self.frames.iter().map(|f| f.yaw).sum::<f32>() / retained,
            mean_pitch: self.frames.iter().map(|f| f.pitch).sum::<f32>() / retained,
            mean_roll: self.frames.iter().map(|f| f.roll).sum::<f32>() / retained,
            max_yaw_deviation: self
                .frames
                .iter()
                .map(|f| f.yaw.abs())
                .fold(0.0, f32::max),
            max_pitch_deviation: self
                .frames
                .iter()
                .map(|f| f.pitch.abs())
                .fold(0.0, f32::max),
        };

        let measured: Vec<f32> = self
            .frames
            .iter()
            .map(|f| f.eye_aspect_ratio)
            .filter(|&e| e > 0.0)
            .collect();
        let eyes = EyeStats {
            mean_ear: if measured.is_empty() {
                0.0
            } else {
                measured.iter().sum::<f32>() / measured.len() as f32
            },
            eyes_closed_ratio: if measured.is_empty() {
                0.0
            } else {
                measured
                    .iter()
                    .filter(|&&e| e < self.config.blink_threshold)
                    .count() as f32
                    / measured.len() as f32
            },
            blink_count: self.blink_total,
            blink_rate_per_min: if duration_s > 0.0 {
                self.blink_total as f32 / duration_s as f32 * 60.0
            } else {
                0.0
            },
        };

        let face_detection_rate =
            self.detected_frames as f32 / self.total_frames as f32 * 100.0;

        // Detected frames over wall-clock seconds; the cap is load-bearing
        let presence_rate = if duration_s > 0.0 {
            ((self.detected_frames as f64 / duration_s) * 100.0).min(100.0) as f32
        } else {
            0.0
        };

        let attention_score = (100.0
            - 2.0 * head_pose.max_yaw_deviation
            - 2.0 * head_pose.max_pitch_deviation
            - 10.0 * self.counts.looking_away as f32)
            .clamp(0.0, 100.0);
        let stability_score = (face_detection_rate
            - 5.0 * self.counts.face_not_detected as f32)
            .clamp(0.0, 100.0);
        let overall_score =
            (attention_score + stability_score + average_confidence * 100.0) / 3.0;

        let recommendations = build_recommendations(
            true,
            duration_s,
            face_detection_rate,
            &self.counts,
            &eyes,
            attention_score,
        );

        info!(
            "session {} finalized: {} frames, {} violations, overall {:.0}",
            self.session_id,
            self.total_frames,
            self.counts.total(),
            overall_score
        );

        MonitoringReport {
            session_id: self.session_id,
            started_at: self.started_at,
            session_duration_s: duration_s,
            total_detections: self.total_frames,
            average_confidence,
            face_detection_rate,
            presence_rate,
            head_pose,
            eyes,
            violations: self.counts,
            violation_log: self.violation_log,
            attention_score,
            stability_score,
            overall_score,
            recommendations,
        }
    }

    fn empty_report(self, now_ms: u64) -> MonitoringReport {
        MonitoringReport {
            session_id: self.session_id,
            started_at: self.started_at,
            session_duration_s: now_ms as f64 / 1000.0,
            total_detections: 0,
            average_confidence: 0.0,
            face_detection_rate: 0.0,
            presence_rate: 0.0,
            head_pose: HeadPoseStats::default(),
            eyes: EyeStats::default(),
            violations: self.counts,
            violation_log: self.violation_log,
            attention_score: 0.0,
            stability_score: 0.0,
            overall_score: 0.0,
            recommendations: build_recommendations(
                false,
                0.0,
                0.0,
                &self.counts,
                &EyeStats::default(),
                0.0,
            ),
        }
    }
}
