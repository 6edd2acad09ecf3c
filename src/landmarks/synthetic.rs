use focus_pose::{LandmarkSet, PoseEstimate, PoseEstimator};

use super::{DetectorError, LandmarkProvider};
use crate::frame::Frame;

/// Mock detector: every frame contains one face held at a fixed orientation.
#[derive(Debug, Clone, Default)]
pub struct SyntheticLandmarkProvider {
    estimator: PoseEstimator,
    pose: PoseEstimate,
}

impl SyntheticLandmarkProvider {
    pub fn new(pose: PoseEstimate) -> Self {
        Self {
            estimator: PoseEstimator::default(),
            pose,
        }
    }

    pub fn frontal() -> Self {
        Self::new(PoseEstimate::default())
    }
}

#[axum::async_trait]
impl LandmarkProvider for SyntheticLandmarkProvider {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn detect(&self, frame: &Frame) -> Result<Option<LandmarkSet>, DetectorError> {
        Ok(self
            .estimator
            .synthesize(self.pose, frame.width(), frame.height()))
    }
}
