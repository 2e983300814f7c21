pub mod health;
pub mod plant;
pub mod upload;

use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::panic_response;
use crate::state::AppState;

pub const PLANT_PREFIX: &str = "/api/v1/plant";
pub const UPLOAD_PREFIX: &str = "/api/v1/upload";

/// Assemble every route group and the middleware stack around it.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let mut router = Router::new().route("/", get(health::root));
    if state.diagnostics {
        router = router.route("/test-db", get(health::test_db));
    }

    router
        .route(&format!("{PLANT_PREFIX}/"), plant::collection())
        .nest(PLANT_PREFIX, plant::router())
        .nest(UPLOAD_PREFIX, upload::router(&state.upload))
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route not found: {}", uri.path()),
        })),
    )
}
