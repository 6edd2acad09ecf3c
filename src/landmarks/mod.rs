pub mod remote;
pub mod synthetic;

use std::sync::Arc;

use focus_pose::LandmarkSet;

use crate::config::LandmarkConfig;
use crate::frame::Frame;

pub use remote::RemoteLandmarkProvider;
pub use synthetic::SyntheticLandmarkProvider;

/// Face landmark detection, shared by every session for the life of the process.
///
/// Implementations must tolerate concurrent calls from independent sessions.
#[axum::async_trait]
pub trait LandmarkProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Landmarks of the first face in the frame, `None` when there is no face.
    async fn detect(&self, frame: &Frame) -> Result<Option<LandmarkSet>, DetectorError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectorError {
    #[error("landmark detector timed out")]
    Timeout,
    #[error("landmark detector network error: {0}")]
    Network(String),
    #[error("landmark detector error: status={status}, message={message}")]
    Status { status: u16, message: String },
    #[error("landmark detector returned malformed data: {0}")]
    Decode(String),
}

/// Validate detector configuration at startup.
/// Panics when the remote detector is selected without an endpoint.
pub fn validate_config(config: &LandmarkConfig) {
    if !config.mock && config.api_url.trim().is_empty() {
        panic!(
            "Invalid landmark configuration: LANDMARK_MOCK=false requires LANDMARK_API_URL. \
             Set LANDMARK_API_URL or LANDMARK_MOCK=true."
        );
    }
}

pub fn from_config(config: &LandmarkConfig) -> Arc<dyn LandmarkProvider> {
    if config.mock {
        tracing::warn!("Landmark provider running in mock mode, every frame shows a frontal face");
        Arc::new(SyntheticLandmarkProvider::frontal())
    } else {
        tracing::info!(api_url = %config.api_url, "Using remote landmark provider");
        Arc::new(RemoteLandmarkProvider::new(config))
    }
}
