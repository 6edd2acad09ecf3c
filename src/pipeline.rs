use std::sync::Arc;

use focus_pose::{PoseError, PoseEstimator, PoseObservation};

use crate::frame::{decode_payload, FrameError};
use crate::landmarks::{DetectorError, LandmarkProvider};

/// Why a frame produced no pose.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameFailure {
    /// Reported to the client as `Error: ...`.
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("no face in frame")]
    NoFace,
    #[error(transparent)]
    Pose(#[from] PoseError),
    #[error(transparent)]
    Detector(#[from] DetectorError),
}

impl FrameFailure {
    /// Transport/format failures surface as errors; everything else means "no pose".
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Frame(_))
    }
}

/// decode -> detect -> estimate, shared by every session.
#[derive(Clone)]
pub struct FramePipeline {
    provider: Arc<dyn LandmarkProvider>,
    estimator: PoseEstimator,
}

impl FramePipeline {
    pub fn new(provider: Arc<dyn LandmarkProvider>) -> Self {
        Self {
            provider,
            estimator: PoseEstimator::default(),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn analyze(&self, payload: &str) -> Result<PoseObservation, FrameFailure> {
        let frame = decode_payload(payload)?;

        let landmarks = match self.provider.detect(&frame).await {
            Ok(Some(landmarks)) => landmarks,
            Ok(None) => return Err(FrameFailure::NoFace),
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "Landmark detection failed");
                return Err(e.into());
            }
        };

        self.estimator
            .estimate(&landmarks, frame.width(), frame.height())
            .map_err(|e| {
                tracing::debug!(error = %e, "Pose estimation failed");
                FrameFailure::from(e)
            })
    }
}
