//! Guarded model loading
//!
//! Model loads are slow, can fail, and must never hang the session start:
//! each attempt runs on the blocking pool under a timeout, and after a
//! bounded number of attempts the caller is told to degrade to the heuristic
//! strategy instead of blocking the session.

use crate::model::{ModelConfig, ModelDetector};
use crate::DetectError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Retry/timeout policy for model loading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadPolicy {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Per-attempt timeout (milliseconds)
    pub timeout_ms: u64,
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            timeout_ms: 15_000,
        }
    }
}

/// Load the model detector, retrying per the policy. Returns
/// [`DetectError::ModelUnavailable`] once attempts are exhausted so the
/// caller can fall back to heuristic detection.
pub async fn load_with_retry(
    config: ModelConfig,
    policy: LoadPolicy,
) -> Result<ModelDetector, DetectError> {
    let attempts = policy.max_retries + 1;
    for attempt in 1..=attempts {
        let cfg = config.clone();
        let load = tokio::task::spawn_blocking(move || ModelDetector::new(cfg));

        match tokio::time::timeout(Duration::from_millis(policy.timeout_ms), load).await {
            Ok(Ok(Ok(detector))) => {
                info!("detection models loaded (attempt {}/{})", attempt, attempts);
                return Ok(detector);
            }
            Ok(Ok(Err(e))) => {
                warn!("model load attempt {}/{} failed: {}", attempt, attempts, e);
            }
            Ok(Err(e)) => {
                warn!("model load task aborted on attempt {}/{}: {}", attempt, attempts, e);
            }
            Err(_) => {
                warn!(
                    "model load attempt {}/{} timed out after {}ms",
                    attempt, attempts, policy.timeout_ms
                );
            }
        }
    }

    Err(DetectError::ModelUnavailable { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_model_exhausts_attempts() {
        let config = ModelConfig {
            face_model_path: "/nonexistent/face.onnx".to_string(),
            object_model_path: None,
            ..Default::default()
        };
        let policy = LoadPolicy {
            max_retries: 2,
            timeout_ms: 5_000,
        };

        match load_with_retry(config, policy).await {
            Err(DetectError::ModelUnavailable { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected ModelUnavailable, got {:?}", other.map(|_| ())),
        }
    }
}
