//! Session configuration

use camera_stream::CameraConfig;
use face_detection::{HeuristicConfig, LoadPolicy, ModelConfig};
use serde::{Deserialize, Serialize};
use session_report::AggregatorConfig;
use violation_engine::ClassifierConfig;

/// Configuration for one monitoring session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub camera: CameraConfig,
    /// Model-based detection; `None` runs heuristic-only from the start
    pub model: Option<ModelConfig>,
    /// Retry/timeout discipline for model loading
    pub load_policy: LoadPolicy,
    /// Heuristic detector tunables (also the fallback when models fail)
    pub heuristic: HeuristicConfig,
    pub classifier: ClassifierConfig,
    pub aggregator: AggregatorConfig,
    /// Bound of the caller-facing event queue
    pub event_queue_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            model: Some(ModelConfig::default()),
            load_policy: LoadPolicy::default(),
            heuristic: HeuristicConfig::default(),
            classifier: ClassifierConfig::default(),
            aggregator: AggregatorConfig::default(),
            event_queue_depth: 32,
        }
    }
}

impl SessionConfig {
    /// Heuristic-only configuration, for hosts without model assets
    pub fn basic() -> Self {
        Self {
            model: None,
            ..Default::default()
        }
    }
}
