//! Frame sampler and camera device port

use crate::frame::VideoFrame;
use crate::{CameraConfig, CameraError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Port to the platform capture API.
///
/// The embedding application supplies the production binding (browser media
/// stream, V4L2, AVFoundation); the monitoring pipeline only depends on this
/// trait. `open` covers the permission request and may fail with
/// [`CameraError::PermissionDenied`].
pub trait CameraDevice: Send {
    /// Request access and start the stream
    fn open(&mut self) -> Result<(), CameraError>;

    /// Grab the current frame, or `None` if the stream has no frame ready
    fn grab(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Release the device so the hardware indicator turns off
    fn close(&mut self);
}

/// Sampler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Ready,
    Denied,
    Stopped,
}

/// Pulls frames from the camera at the session cadence and owns the
/// permission lifecycle. `stop` is idempotent: the device is released
/// exactly once no matter how many times it is called.
pub struct FrameSampler {
    device: Box<dyn CameraDevice>,
    state: SamplerState,
    config: CameraConfig,
}

impl FrameSampler {
    pub fn new(device: Box<dyn CameraDevice>, config: CameraConfig) -> Self {
        Self {
            device,
            state: SamplerState::Idle,
            config,
        }
    }

    /// Request camera access. Denial is terminal for the session: the caller
    /// must surface it to the user rather than retry automatically.
    pub fn start(&mut self) -> Result<(), CameraError> {
        match self.device.open() {
            Ok(()) => {
                info!("camera stream ready ({}x{})", self.config.width, self.config.height);
                self.state = SamplerState::Ready;
                Ok(())
            }
            Err(CameraError::PermissionDenied) => {
                warn!("camera permission denied");
                self.state = SamplerState::Denied;
                Err(CameraError::PermissionDenied)
            }
            Err(e) => {
                warn!("camera failed to open: {}", e);
                self.state = SamplerState::Denied;
                Err(e)
            }
        }
    }

    /// Grab the current frame, or `None` when the stream is not ready
    pub fn sample(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.state != SamplerState::Ready {
            return Ok(None);
        }
        self.device.grab()
    }

    /// Release the camera. Safe to call repeatedly and from any state.
    pub fn stop(&mut self) {
        if self.state == SamplerState::Ready {
            self.device.close();
            info!("camera released");
        }
        self.state = SamplerState::Stopped;
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

/// Deterministic in-memory camera used by tests and demos.
///
/// Plays a scripted frame list in order, then keeps returning the last frame
/// so a sampling loop never starves.
pub struct SyntheticCamera {
    frames: Vec<VideoFrame>,
    cursor: usize,
    deny: bool,
    opened: bool,
    close_count: Arc<AtomicU32>,
}

impl SyntheticCamera {
    pub fn new(frames: Vec<VideoFrame>) -> Self {
        Self {
            frames,
            cursor: 0,
            deny: false,
            opened: false,
            close_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// A camera whose permission request always fails
    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::new(Vec::new())
        }
    }

    /// Shared counter of `close` invocations; clone before boxing the device
    /// to observe release behavior from a test.
    pub fn close_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.close_count)
    }
}

impl CameraDevice for SyntheticCamera {
    fn open(&mut self) -> Result<(), CameraError> {
        if self.deny {
            return Err(CameraError::PermissionDenied);
        }
        self.opened = true;
        Ok(())
    }

    fn grab(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if !self.opened {
            return Err(CameraError::NotStarted);
        }
        if self.frames.is_empty() {
            return Ok(None);
        }
        let frame = self.frames[self.cursor.min(self.frames.len() - 1)].clone();
        if self.cursor + 1 < self.frames.len() {
            self.cursor += 1;
        }
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.opened = false;
        self.close_count.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_frame(seq: u32) -> VideoFrame {
        let mut f = VideoFrame::solid([128, 128, 128], 8, 8);
        f.sequence = seq;
        f
    }

    #[test]
    fn test_sample_before_start_returns_none() {
        let mut sampler = FrameSampler::new(
            Box::new(SyntheticCamera::new(vec![gray_frame(0)])),
            CameraConfig::default(),
        );
        assert!(sampler.sample().unwrap().is_none());
    }

    #[test]
    fn test_permission_denied_is_terminal() {
        let mut sampler = FrameSampler::new(
            Box::new(SyntheticCamera::denied()),
            CameraConfig::default(),
        );
        assert!(matches!(sampler.start(), Err(CameraError::PermissionDenied)));
        assert_eq!(sampler.state(), SamplerState::Denied);
        assert!(sampler.sample().unwrap().is_none());
    }

    #[test]
    fn test_scripted_frames_repeat_last() {
        let mut sampler = FrameSampler::new(
            Box::new(SyntheticCamera::new(vec![gray_frame(0), gray_frame(1)])),
            CameraConfig::default(),
        );
        sampler.start().unwrap();
        assert_eq!(sampler.sample().unwrap().unwrap().sequence, 0);
        assert_eq!(sampler.sample().unwrap().unwrap().sequence, 1);
        // Script exhausted: last frame repeats
        assert_eq!(sampler.sample().unwrap().unwrap().sequence, 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let camera = SyntheticCamera::new(vec![gray_frame(0)]);
        let closes = camera.close_counter();
        let mut sampler = FrameSampler::new(Box::new(camera), CameraConfig::default());
        sampler.start().unwrap();
        sampler.stop();
        sampler.stop();
        sampler.stop();
        assert_eq!(sampler.state(), SamplerState::Stopped);
        assert_eq!(closes.load(Ordering::Relaxed), 1);
        assert!(sampler.sample().unwrap().is_none());
    }
}
