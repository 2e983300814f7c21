use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use plant_db::ConnectionState;

use crate::state::AppState;

pub const LIVENESS_TEXT: &str = "App is running fine";

pub async fn root() -> &'static str {
    LIVENESS_TEXT
}

/// Connection-state report for debugging deployments.
pub async fn test_db(State(state): State<AppState>) -> Json<Value> {
    let status = state.store.status();
    Json(json!({
        "success": status.state == ConnectionState::Connected,
        "state": status.state.as_str(),
        "readyState": status.state.ready_state(),
        "database": status.database,
    }))
}
