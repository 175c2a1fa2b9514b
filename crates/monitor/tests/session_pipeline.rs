//! End-to-end pipeline tests: scripted detections driven through the
//! controller at virtual time, checked against the delivered events and the
//! final report.

use camera_stream::{SyntheticCamera, VideoFrame};
use face_detection::{
    BoundingBox, DetectError, Detection, Detector, DetectorKind, Face, FaceLandmarks, Point,
};
use monitor::{MonitorEvent, MonitoringSession, SessionConfig};
use std::time::Duration;

/// Plays a fixed detection script, repeating the last entry
struct ScriptedDetector {
    script: Vec<Detection>,
    cursor: usize,
}

impl ScriptedDetector {
    fn new(script: Vec<Detection>) -> Self {
        Self { script, cursor: 0 }
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, _frame: &VideoFrame) -> Result<Detection, DetectError> {
        let detection = self.script[self.cursor.min(self.script.len() - 1)].clone();
        if self.cursor + 1 < self.script.len() {
            self.cursor += 1;
        }
        Ok(detection)
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::Heuristic
    }
}

fn camera() -> Box<SyntheticCamera> {
    Box::new(SyntheticCamera::new(vec![VideoFrame::solid(
        [128, 128, 128],
        64,
        64,
    )]))
}

fn eye(cx: f32, cy: f32, half_h: f32) -> [Point; 6] {
    [
        Point::new(cx - 15.0, cy),
        Point::new(cx - 7.5, cy - half_h),
        Point::new(cx + 7.5, cy - half_h),
        Point::new(cx + 15.0, cy),
        Point::new(cx + 7.5, cy + half_h),
        Point::new(cx - 7.5, cy + half_h),
    ]
}

/// A steady frontal face; `eye_half_h` 4.5 gives EAR 0.3, 1.5 gives 0.1
fn face(eye_half_h: f32) -> Detection {
    Detection {
        faces: vec![Face {
            bbox: BoundingBox {
                x: 190.0,
                y: 140.0,
                width: 220.0,
                height: 220.0,
            },
            confidence: 0.9,
            landmarks: Some(FaceLandmarks {
                left_eye: eye(270.0, 200.0, eye_half_h),
                right_eye: eye(330.0, 200.0, eye_half_h),
                nose_tip: Point::new(300.0, 230.0),
                chin: Point::new(300.0, 300.0),
            }),
        }],
        objects: vec![],
    }
}

fn absent() -> Detection {
    Detection::default()
}

async fn drain(events: &mut tokio::sync::mpsc::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        let is_report = matches!(event, MonitorEvent::Report(_));
        collected.push(event);
        if is_report {
            break;
        }
    }
    collected
}

#[tokio::test(start_paused = true)]
async fn empty_camera_view_emits_one_debounced_violation() {
    let (mut session, mut events) = MonitoringSession::channel(SessionConfig::basic());
    session
        .start_with_detector(camera(), Box::new(ScriptedDetector::new(vec![absent()])))
        .unwrap();

    // Ticks land at 0, 900 and 1800ms; face-absence confirms on the second
    // tick and the third falls inside its cooldown
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    session.stop().await.unwrap();

    let collected = drain(&mut events).await;
    assert!(matches!(collected[0], MonitorEvent::CameraReady(true)));

    let violations: Vec<_> = collected
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::Violation(v) => Some(v),
            _ => None,
        })
        .collect();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind.as_str(), "face_not_detected");
    assert_eq!(violations[0].timestamp_ms, 900);

    let report = collected
        .iter()
        .find_map(|e| match e {
            MonitorEvent::Report(r) => Some(r),
            _ => None,
        })
        .expect("report must be delivered");
    assert_eq!(report.total_detections, 3);
    assert_eq!(report.violations.face_not_detected, 1);
    assert_eq!(report.violation_log.len(), 1);
    assert_eq!(report.face_detection_rate, 0.0);
    assert!(report
        .recommendations
        .iter()
        .any(|tip| tip.contains("lost sight")));
}

#[tokio::test(start_paused = true)]
async fn steady_face_produces_clean_report() {
    let (mut session, mut events) = MonitoringSession::channel(SessionConfig::basic());
    session
        .start_with_detector(camera(), Box::new(ScriptedDetector::new(vec![face(4.5)])))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(4_000)).await;
    session.stop().await.unwrap();

    let collected = drain(&mut events).await;
    assert!(collected
        .iter()
        .all(|e| !matches!(e, MonitorEvent::Violation(_))));

    let report = collected
        .iter()
        .find_map(|e| match e {
            MonitorEvent::Report(r) => Some(r),
            _ => None,
        })
        .unwrap();
    assert!(report.total_detections >= 4);
    assert_eq!(report.face_detection_rate, 100.0);
    assert!((report.average_confidence - 0.9).abs() < 0.001);
    assert_eq!(report.violations.total(), 0);
    assert!((report.eyes.mean_ear - 0.3).abs() < 0.01);
    assert_eq!(report.recommendations.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn blink_is_counted_once_end_to_end() {
    let (mut session, mut events) = MonitoringSession::channel(SessionConfig::basic());
    // Eyes open, open, closed, open: one downward EAR crossing
    let script = vec![face(4.5), face(4.5), face(1.5), face(4.5)];
    session
        .start_with_detector(camera(), Box::new(ScriptedDetector::new(script)))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(3_300)).await;
    session.stop().await.unwrap();

    let collected = drain(&mut events).await;
    let report = collected
        .iter()
        .find_map(|e| match e {
            MonitorEvent::Report(r) => Some(r),
            _ => None,
        })
        .unwrap();
    assert_eq!(report.eyes.blink_count, 1);
    assert!(report.eyes.eyes_closed_ratio > 0.0);
}

#[tokio::test(start_paused = true)]
async fn violations_reach_both_the_queue_and_the_log() {
    let (mut session, mut events) = MonitoringSession::channel(SessionConfig::basic());
    // Absence, recovery, absence again across cooldown windows
    let mut script = vec![absent(); 8];
    script.extend(vec![face(4.5); 2]);
    script.extend(vec![absent(); 8]);
    session
        .start_with_detector(camera(), Box::new(ScriptedDetector::new(script)))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(16_500)).await;
    session.stop().await.unwrap();

    let collected = drain(&mut events).await;
    let forwarded = collected
        .iter()
        .filter(|e| matches!(e, MonitorEvent::Violation(_)))
        .count();
    let report = collected
        .iter()
        .find_map(|e| match e {
            MonitorEvent::Report(r) => Some(r),
            _ => None,
        })
        .unwrap();
    assert!(forwarded >= 2);
    // Every forwarded notification has its logged twin
    assert_eq!(forwarded, report.violation_log.len());
    assert_eq!(report.violations.face_not_detected, forwarded);
}

#[tokio::test(start_paused = true)]
async fn report_is_delivered_exactly_once() {
    let (mut session, mut events) = MonitoringSession::channel(SessionConfig::basic());
    session
        .start_with_detector(camera(), Box::new(ScriptedDetector::new(vec![face(4.5)])))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    session.stop().await.unwrap();
    session.stop().await.unwrap();

    let collected = drain(&mut events).await;
    let reports = collected
        .iter()
        .filter(|e| matches!(e, MonitorEvent::Report(_)))
        .count();
    assert_eq!(reports, 1);
    // Nothing follows the report for this session
    assert!(tokio::time::timeout(Duration::from_millis(100), events.recv())
        .await
        .is_err());
}
