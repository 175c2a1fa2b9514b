//! Session lifecycle and the sampling loop

use crate::{MonitorError, SessionConfig};
use camera_stream::{CameraDevice, CameraError, FrameSampler};
use face_detection::{load_with_retry, Detector, HeuristicDetector, ModelDetector};
use session_report::{FrameRecord, MonitoringReport, SessionAggregator};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use violation_engine::{ViolationClassifier, ViolationRecord};

/// Events delivered to the caller on the session queue
#[derive(Debug)]
pub enum MonitorEvent {
    /// Camera stream ready (`true`) or permission denied (`false`)
    CameraReady(bool),
    /// Model loading exhausted its retries; running in heuristic mode
    DetectorDegraded,
    /// One debounced violation, at most one per kind per cooldown window
    Violation(ViolationRecord),
    /// Final report, exactly once per session
    Report(Box<MonitoringReport>),
}

/// Controller lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    PermissionRequested,
    Active,
    Denied,
}

/// Monitoring session controller.
///
/// One instance drives one session at a time: `start` opens the camera,
/// picks a detector, and spawns the sampling task; `stop` shuts the task
/// down, releases the camera, and emits the report. `stop` on an inactive
/// session is a no-op.
pub struct MonitoringSession {
    config: SessionConfig,
    state: SessionState,
    events_tx: mpsc::Sender<MonitorEvent>,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
    /// Model weights survive session boundaries; one load serves them all
    loaded_model: Option<ModelDetector>,
}

impl MonitoringSession {
    /// Create a session controller and the caller's event receiver
    pub fn channel(config: SessionConfig) -> (Self, mpsc::Receiver<MonitorEvent>) {
        let (events_tx, events_rx) = mpsc::channel(config.event_queue_depth);
        (
            Self {
                config,
                state: SessionState::Idle,
                events_tx,
                shutdown_tx: None,
                task: None,
                loaded_model: None,
            },
            events_rx,
        )
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Start a session: request the camera, then pick a detector (the
    /// configured models when they load, the heuristic otherwise).
    pub async fn start(&mut self, device: Box<dyn CameraDevice>) -> Result<(), MonitorError> {
        if self.state == SessionState::Active {
            return Err(MonitorError::AlreadyActive);
        }
        let sampler = self.open_camera(device)?;

        let detector: Box<dyn Detector> = match (&self.loaded_model, &self.config.model) {
            (Some(loaded), _) => Box::new(loaded.clone()),
            (None, Some(model_config)) => {
                match load_with_retry(model_config.clone(), self.config.load_policy.clone()).await
                {
                    Ok(detector) => {
                        self.loaded_model = Some(detector.clone());
                        Box::new(detector)
                    }
                    Err(e) => {
                        warn!("degrading to heuristic detection: {}", e);
                        let _ = self.events_tx.try_send(MonitorEvent::DetectorDegraded);
                        Box::new(HeuristicDetector::new(self.config.heuristic.clone()))
                    }
                }
            }
            (None, None) => Box::new(HeuristicDetector::new(self.config.heuristic.clone())),
        };

        self.spawn_loop(sampler, detector);
        Ok(())
    }

    /// Start with a caller-supplied detection strategy
    pub fn start_with_detector(
        &mut self,
        device: Box<dyn CameraDevice>,
        detector: Box<dyn Detector>,
    ) -> Result<(), MonitorError> {
        if self.state == SessionState::Active {
            return Err(MonitorError::AlreadyActive);
        }
        let sampler = self.open_camera(device)?;
        self.spawn_loop(sampler, detector);
        Ok(())
    }

    /// Stop the session. Idempotent; the camera is released and the report
    /// emitted exactly once.
    pub async fn stop(&mut self) -> Result<(), MonitorError> {
        if self.state != SessionState::Active {
            debug!("stop on inactive session is a no-op");
            return Ok(());
        }
        if let Some(shutdown) = self.shutdown_tx.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("sampling task ended abnormally: {}", e);
            }
        }
        self.state = SessionState::Idle;
        info!("monitoring session stopped");
        Ok(())
    }

    fn open_camera(&mut self, device: Box<dyn CameraDevice>) -> Result<FrameSampler, MonitorError> {
        self.state = SessionState::PermissionRequested;
        let mut sampler = FrameSampler::new(device, self.config.camera.clone());
        match sampler.start() {
            Ok(()) => {
                let _ = self.events_tx.try_send(MonitorEvent::CameraReady(true));
                Ok(sampler)
            }
            Err(e) => {
                self.state = SessionState::Denied;
                let _ = self.events_tx.try_send(MonitorEvent::CameraReady(false));
                Err(e.into())
            }
        }
    }

    fn spawn_loop(&mut self, sampler: FrameSampler, detector: Box<dyn Detector>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let classifier = ViolationClassifier::new(self.config.classifier.clone());
        let aggregator = SessionAggregator::new(self.config.aggregator.clone());
        let interval_ms = self.config.camera.sample_interval_ms;
        let events = self.events_tx.clone();

        info!(
            "monitoring session {} started ({}ms cadence)",
            aggregator.session_id(),
            interval_ms
        );
        self.task = Some(tokio::spawn(run_session(
            sampler,
            detector,
            classifier,
            aggregator,
            events,
            shutdown_rx,
            interval_ms,
        )));
        self.shutdown_tx = Some(shutdown_tx);
        self.state = SessionState::Active;
    }
}

/// The sampling loop. Ticks never overlap: each tick runs to completion
/// inside the select arm, and missed ticks are skipped rather than queued.
/// Shutdown wins the race, so no tick can mutate state after `stop`.
async fn run_session(
    mut sampler: FrameSampler,
    mut detector: Box<dyn Detector>,
    mut classifier: ViolationClassifier,
    mut aggregator: SessionAggregator,
    events: mpsc::Sender<MonitorEvent>,
    mut shutdown: watch::Receiver<bool>,
    interval_ms: u64,
) {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let now_ms = started.elapsed().as_millis() as u64;
                run_tick(
                    &mut sampler,
                    detector.as_mut(),
                    &mut classifier,
                    &mut aggregator,
                    &events,
                    now_ms,
                );
            }
        }
    }

    // Independent obligations: the camera is released first so a report
    // failure can never keep the device busy
    sampler.stop();

    let now_ms = started.elapsed().as_millis() as u64;
    let report = aggregator.finalize(now_ms);
    if events
        .send(MonitorEvent::Report(Box::new(report)))
        .await
        .is_err()
    {
        warn!("report receiver dropped before delivery");
    }
}

fn run_tick(
    sampler: &mut FrameSampler,
    detector: &mut dyn Detector,
    classifier: &mut ViolationClassifier,
    aggregator: &mut SessionAggregator,
    events: &mpsc::Sender<MonitorEvent>,
    now_ms: u64,
) {
    let frame = match sampler.sample() {
        Ok(Some(frame)) => frame,
        Ok(None) => return,
        Err(e) => {
            warn!("frame sample failed: {}", e);
            return;
        }
    };

    // A single bad inference skips the frame, never the loop
    let detection = match detector.detect(&frame) {
        Ok(detection) => detection,
        Err(e) => {
            warn!("detection failed, skipping frame: {}", e);
            return;
        }
    };

    let features = frame_features::extract(&detection);
    let violations = classifier.evaluate(&features, now_ms);
    aggregator.record_frame(FrameRecord::from_features(&features, now_ms));

    for violation in violations {
        // Log append and caller notification happen in one synchronous
        // section; the log is authoritative if the queue is saturated
        aggregator.record_violation(violation.clone());
        if events.try_send(MonitorEvent::Violation(violation)).is_err() {
            warn!("event queue full; violation notification dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_stream::{SyntheticCamera, VideoFrame};

    fn camera() -> Box<SyntheticCamera> {
        Box::new(SyntheticCamera::new(vec![VideoFrame::solid(
            [128, 128, 128],
            64,
            64,
        )]))
    }

    #[tokio::test]
    async fn test_denied_camera_surfaces_and_ends_denied() {
        let (mut session, mut events) = MonitoringSession::channel(SessionConfig::basic());
        let result = session.start(Box::new(SyntheticCamera::denied())).await;
        assert!(matches!(
            result,
            Err(MonitorError::Camera(CameraError::PermissionDenied))
        ));
        assert_eq!(session.state(), SessionState::Denied);
        assert!(matches!(
            events.recv().await,
            Some(MonitorEvent::CameraReady(false))
        ));
    }

    #[tokio::test]
    async fn test_start_while_active_is_rejected() {
        let (mut session, _events) = MonitoringSession::channel(SessionConfig::basic());
        session.start(camera()).await.unwrap();
        assert!(matches!(
            session.start(camera()).await,
            Err(MonitorError::AlreadyActive)
        ));
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_a_noop() {
        let (mut session, _events) = MonitoringSession::channel(SessionConfig::basic());
        session.stop().await.unwrap();
        session.stop().await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_double_stop_releases_camera_once() {
        let device = SyntheticCamera::new(vec![VideoFrame::solid([128, 128, 128], 64, 64)]);
        let closes = device.close_counter();

        let (mut session, _events) = MonitoringSession::channel(SessionConfig::basic());
        session.start(Box::new(device)).await.unwrap();
        session.stop().await.unwrap();
        session.stop().await.unwrap();
        assert_eq!(closes.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let (mut session, _events) = MonitoringSession::channel(SessionConfig::basic());
        session.start(camera()).await.unwrap();
        session.stop().await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        session.start(camera()).await.unwrap();
        assert_eq!(session.state(), SessionState::Active);
        session.stop().await.unwrap();
    }
}
