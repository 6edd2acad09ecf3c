mod common;

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::ws::Message;
use axum::http::StatusCode;
use axum_test::TestServer;
use focus_pose::SessionConfig;
use futures::channel::mpsc;
use futures::stream;
use tokio::sync::broadcast;

use focus_server::landmarks::SyntheticLandmarkProvider;
use focus_server::pipeline::FramePipeline;
use focus_server::session::FocusSession;

use common::app::{spawn_test_app, spawn_with_provider, ScriptedProvider};
use common::fixtures::{data_url_frame, png_frame, pose};

const CALIBRATING: &str = "Calculating Face Angles";

async fn run_script(
    provider: ScriptedProvider,
    config: SessionConfig,
    payloads: Vec<Message>,
) -> Vec<String> {
    let pipeline = Arc::new(FramePipeline::new(Arc::new(provider)));
    let session = FocusSession::new(pipeline, config);
    let (tx, mut rx) = mpsc::unbounded();
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let inbound = stream::iter(payloads.into_iter().map(Ok::<_, Infallible>));
    session.drive(inbound, tx, shutdown_rx).await;

    let mut out = Vec::new();
    while let Ok(Some(message)) = rx.try_next() {
        if let Message::Text(text) = message {
            out.push(text);
        }
    }
    out
}

fn text(payload: String) -> Message {
    Message::Text(payload)
}

#[tokio::test]
async fn calibrates_then_classifies_against_baseline() {
    let mut script = vec![pose(0.0, 0.0, 0.0); 10];
    script.push(pose(5.0, 5.0, 5.0));
    script.push(pose(45.0, 0.0, 0.0));
    let frames = (0..12).map(|_| text(png_frame(640, 480))).collect();

    let replies = run_script(ScriptedProvider::new(script), SessionConfig::default(), frames).await;

    assert_eq!(replies.len(), 12);
    assert!(replies[..10].iter().all(|r| r == CALIBRATING));
    assert_eq!(replies[10], "Focused");
    assert_eq!(replies[11], "Not Focused");
}

#[tokio::test]
async fn failed_frames_do_not_consume_calibration() {
    let script = vec![None, pose(0.0, 0.0, 0.0), pose(0.0, 0.0, 0.0), pose(0.0, 0.0, 0.0)];
    let frames = vec![
        text("%%% not base64 %%%".to_string()),
        text(png_frame(640, 480)),
        text(data_url_frame(640, 480)),
        text(png_frame(640, 480)),
        text(png_frame(640, 480)),
    ];
    let config = SessionConfig {
        calibration_frames: 3,
        threshold_deg: 40.0,
    };

    let replies = run_script(ScriptedProvider::new(script), config, frames).await;

    assert!(replies[0].starts_with("Error: Decoding Base64 failed - "));
    assert_eq!(replies[1], "Pose Not Detected");
    assert_eq!(&replies[2..5], &[CALIBRATING, CALIBRATING, CALIBRATING]);
}

#[tokio::test]
async fn non_image_payload_is_an_invalid_frame() {
    use base64::Engine;
    let garbage = base64::engine::general_purpose::STANDARD.encode(b"plain text, not pixels");
    let replies = run_script(
        ScriptedProvider::new(vec![]),
        SessionConfig::default(),
        vec![text(garbage)],
    )
    .await;
    assert_eq!(replies, vec!["Error: Invalid frame".to_string()]);
}

#[tokio::test]
async fn ws_session_over_http_transport() {
    let app = spawn_test_app();
    let server = TestServer::builder()
        .http_transport()
        .build(app.app.clone())
        .expect("test server");

    let mut ws = server.get_websocket("/ws").await.into_websocket().await;
    for _ in 0..10 {
        ws.send_text(png_frame(320, 240)).await;
        assert_eq!(ws.receive_text().await, CALIBRATING);
    }
    ws.send_text(png_frame(320, 240)).await;
    assert_eq!(ws.receive_text().await, "Focused");
    ws.close().await;

    // a new connection starts calibrating from scratch
    let mut again = server.get_websocket("/ws").await.into_websocket().await;
    again.send_text(png_frame(320, 240)).await;
    assert_eq!(again.receive_text().await, CALIBRATING);
}

#[tokio::test]
async fn ws_connections_are_capped() {
    let app = spawn_with_provider(Arc::new(SyntheticLandmarkProvider::frontal()), 1);
    let server = TestServer::builder()
        .http_transport()
        .build(app.app.clone())
        .expect("test server");

    let mut first = server.get_websocket("/ws").await.into_websocket().await;
    first.send_text(png_frame(320, 240)).await;
    assert_eq!(first.receive_text().await, CALIBRATING);

    let rejected = server.get_websocket("/ws").expect_failure().await;
    rejected.assert_status(StatusCode::TOO_MANY_REQUESTS);
}
