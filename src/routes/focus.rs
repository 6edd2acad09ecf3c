use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::StreamExt;
use tracing::Instrument;

use crate::response::AppError;
use crate::session::FocusSession;
use crate::state::{AppState, SessionSlot};

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(focus_ws))
}

/// Upgrade to a focus session. Each connection calibrates from scratch.
pub async fn focus_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let Some(slot) = state.try_open_session() else {
        return Err(AppError::too_many_requests("Too many focus sessions"));
    };

    let max_bytes = state.config().limits.max_frame_bytes;
    Ok(ws
        .max_message_size(max_bytes)
        .max_frame_size(max_bytes)
        .on_upgrade(move |socket| run_session(socket, state, slot)))
}

async fn run_session(socket: WebSocket, state: AppState, _slot: SessionSlot) {
    let session = FocusSession::new(
        state.pipeline().clone(),
        state.config().focus.session_config(),
    );
    let span = tracing::info_span!("focus_session", session_id = %session.id());
    let (outbound, inbound) = socket.split();

    session
        .drive(inbound, outbound, state.shutdown_rx())
        .instrument(span)
        .await;
}
