use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message};
use focus_pose::{CalibrationSession, FocusStatus, SessionConfig};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::frame::FrameError;
use crate::pipeline::{FrameFailure, FramePipeline};

/// One client connection: its calibration state plus the shared frame pipeline.
///
/// Dropped when the connection closes; nothing carries over to the next connection.
pub struct FocusSession {
    id: Uuid,
    calibration: CalibrationSession,
    pipeline: Arc<FramePipeline>,
}

impl FocusSession {
    pub fn new(pipeline: Arc<FramePipeline>, config: SessionConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            calibration: CalibrationSession::new(config),
            pipeline,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn calibration(&self) -> &CalibrationSession {
        &self.calibration
    }

    /// Process one text payload and produce exactly one status.
    pub async fn handle(&mut self, payload: &str) -> FocusStatus {
        let observation = match self.pipeline.analyze(payload).await {
            Ok(observation) => observation,
            Err(FrameFailure::Frame(e)) => {
                tracing::debug!(error = %e, "Rejected frame");
                return FocusStatus::error(e.to_string());
            }
            Err(_) => return FocusStatus::PoseNotDetected,
        };

        let calibrating = self.calibration.baseline().is_none();
        let pose = observation.pose;
        let status = self.calibration.observe(pose);

        if calibrating {
            if let Some(baseline) = self.calibration.baseline() {
                tracing::info!(
                    pitch = baseline.pitch,
                    yaw = baseline.yaw,
                    roll = baseline.roll,
                    "Calibration complete"
                );
            }
        }

        tracing::debug!(
            status = %status,
            pitch = pose.pitch,
            yaw = pose.yaw,
            roll = pose.roll,
            iris = observation.iris.mean(),
            "Frame classified"
        );
        status
    }

    /// Read frames until the client leaves, the transport fails or the server shuts down.
    ///
    /// Frames are handled strictly in arrival order; each text frame gets one reply.
    pub async fn drive<S, K, E>(
        mut self,
        mut inbound: S,
        mut outbound: K,
        mut shutdown: broadcast::Receiver<()>,
    ) where
        S: Stream<Item = Result<Message, E>> + Unpin,
        K: Sink<Message> + Unpin,
        K::Error: Display,
        E: Display,
    {
        tracing::info!("Focus session opened");

        loop {
            let message = tokio::select! {
                message = inbound.next() => message,
                _ = shutdown.recv() => {
                    let close = Message::Close(Some(CloseFrame {
                        code: close_code::AWAY,
                        reason: "server shutting down".into(),
                    }));
                    let _ = outbound.send(close).await;
                    tracing::info!("Focus session closed by shutdown");
                    break;
                }
            };

            let status = match message {
                Some(Ok(Message::Text(payload))) => self.handle(&payload).await,
                Some(Ok(Message::Binary(_))) => FocusStatus::error(FrameError::NotText.to_string()),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!(
                        calibrated = self.calibration.baseline().is_some(),
                        "Focus session disconnected"
                    );
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Focus session transport error");
                    break;
                }
            };

            if let Err(e) = outbound.send(Message::Text(status.to_string())).await {
                tracing::warn!(error = %e, "Failed to send focus status");
                break;
            }
        }
    }
}
