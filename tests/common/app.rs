use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::Router;
use tokio::sync::broadcast;

use focus_pose::{LandmarkSet, PoseEstimate, PoseEstimator};
use focus_server::config::{Config, FocusConfig, LandmarkConfig, LimitsConfig};
use focus_server::frame::Frame;
use focus_server::landmarks::{DetectorError, LandmarkProvider, SyntheticLandmarkProvider};
use focus_server::pipeline::FramePipeline;
use focus_server::routes::build_router;
use focus_server::state::AppState;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub shutdown_tx: broadcast::Sender<()>,
}

/// 直接构造 Config，避免 set_var 造成多线程测试环境变量竞态
pub fn test_config(max_ws_connections: usize) -> Config {
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 8000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        cors_origin: "*".to_string(),
        focus: FocusConfig::default(),
        landmarks: LandmarkConfig {
            mock: true,
            api_url: String::new(),
            api_key: String::new(),
            timeout_secs: 1,
        },
        limits: LimitsConfig {
            max_ws_connections,
            ..Default::default()
        },
    }
}

/// Replays a fixed list of head poses, one per detected frame.
/// `None` entries (and an exhausted script) mean "no face".
pub struct ScriptedProvider {
    poses: Mutex<VecDeque<Option<PoseEstimate>>>,
    estimator: PoseEstimator,
}

impl ScriptedProvider {
    pub fn new(poses: impl IntoIterator<Item = Option<PoseEstimate>>) -> Self {
        Self {
            poses: Mutex::new(poses.into_iter().collect()),
            estimator: PoseEstimator::default(),
        }
    }
}

#[axum::async_trait]
impl LandmarkProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn detect(&self, frame: &Frame) -> Result<Option<LandmarkSet>, DetectorError> {
        let next = self.poses.lock().expect("script lock").pop_front().flatten();
        Ok(next.and_then(|pose| self.estimator.synthesize(pose, frame.width(), frame.height())))
    }
}

pub fn spawn_with_provider(
    provider: Arc<dyn LandmarkProvider>,
    max_ws_connections: usize,
) -> TestApp {
    let config = test_config(max_ws_connections);
    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(&config, FramePipeline::new(provider), shutdown_tx.clone());
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        shutdown_tx,
    }
}

pub fn spawn_test_app() -> TestApp {
    spawn_with_provider(Arc::new(SyntheticLandmarkProvider::frontal()), 16)
}
