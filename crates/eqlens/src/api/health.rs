use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use eqlens_model::ModelBackend;

use super::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub backend: ModelBackend,
    pub version: String,
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        backend: state.backend,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
