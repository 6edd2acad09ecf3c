use std::time::Duration;

use focus_pose::LandmarkSet;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use super::{DetectorError, LandmarkProvider};
use crate::config::LandmarkConfig;
use crate::frame::Frame;

/// Posts the raw image bytes to an HTTP landmark detector.
///
/// Expected response: `{"faces":[{"landmarks":[{"x":0.5,"y":0.4}, ...]}]}`,
/// coordinates normalised to the image size. An empty `faces` list means no face.
#[derive(Debug, Clone)]
pub struct RemoteLandmarkProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    faces: Vec<DetectedFace>,
}

#[derive(Debug, Deserialize)]
struct DetectedFace {
    landmarks: LandmarkSet,
}

impl RemoteLandmarkProvider {
    pub fn new(config: &LandmarkConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[axum::async_trait]
impl LandmarkProvider for RemoteLandmarkProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn detect(&self, frame: &Frame) -> Result<Option<LandmarkSet>, DetectorError> {
        let mut request = self
            .client
            .post(&self.api_url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(frame.encoded().to_vec());
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DetectorError::Timeout
            } else {
                DetectorError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DetectorError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: DetectResponse = response
            .json()
            .await
            .map_err(|e| DetectorError::Decode(e.to_string()))?;

        // multi-face input: only the first face is tracked
        Ok(body.faces.into_iter().next().map(|face| face.landmarks))
    }
}
