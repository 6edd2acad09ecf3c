pub mod focus;
pub mod health;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::constants::GREETING;
use crate::middleware::request_id;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(greeting))
        .merge(focus::router())
        .nest("/health", health::router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}

pub async fn greeting() -> Json<Value> {
    Json(json!({ "message": GREETING }))
}
