use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::pipeline::FramePipeline;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    pipeline: Arc<FramePipeline>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
    active_sessions: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: &Config, pipeline: FramePipeline, shutdown_tx: broadcast::Sender<()>) -> Self {
        Self {
            config: Arc::new(config.clone()),
            pipeline: Arc::new(pipeline),
            shutdown_tx,
            started_at: Instant::now(),
            active_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &Arc<FramePipeline> {
        &self.pipeline
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    /// Reserve a session slot; `None` when the connection cap is reached.
    pub fn try_open_session(&self) -> Option<SessionSlot> {
        let max = self.config.limits.max_ws_connections;
        let current = self.active_sessions.fetch_add(1, Ordering::SeqCst);
        if current >= max {
            self.active_sessions.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(SessionSlot {
            counter: self.active_sessions.clone(),
        })
    }
}

/// Held for the lifetime of a session; releases its slot on drop.
pub struct SessionSlot {
    counter: Arc<AtomicUsize>,
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
