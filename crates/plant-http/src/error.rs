//! Error responses.
//!
//! Handlers answer 400/404 themselves for bad input and unknown ids. Every
//! other failure (store, media host, body parsing, panics) ends up in the
//! catch-all arm: status 500 with a fixed JSON envelope.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use plant_core::error::PlantError;

pub const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(String),
    /// Catch-all: logged and reported as 500.
    Internal(String),
}

impl ApiError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PlantError> for ApiError {
    fn from(err: PlantError) -> Self {
        match err {
            PlantError::NotFound { .. } => Self::NotFound(err.to_string()),
            PlantError::Validation(msg) => Self::BadRequest(msg),
            PlantError::InvalidId(_) => Self::BadRequest(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Internal(error) => {
                tracing::error!(%error, "Request failed");
                json!({
                    "success": false,
                    "message": INTERNAL_MESSAGE,
                    "error": error,
                })
            }
            Self::BadRequest(message) | Self::NotFound(message) | Self::PayloadTooLarge(message) => {
                json!({ "success": false, "message": message })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Panic hook for `CatchPanicLayer`; same envelope as any other internal error.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(detail).into_response()
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn internal_error_uses_fixed_envelope() {
        let response = ApiError::from(PlantError::Timeout(std::time::Duration::from_secs(45)))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], INTERNAL_MESSAGE);
        assert!(body["error"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn handler_errors_keep_their_status() {
        let not_found = ApiError::from(PlantError::NotFound {
            resource: "Plant",
            id: "x".into(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let invalid = ApiError::from(PlantError::Validation("price must be a non-negative number".into()));
        let response = invalid.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "price must be a non-negative number");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn media_and_connection_failures_are_internal() {
        assert_eq!(
            ApiError::from(PlantError::MediaHost("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(PlantError::NotConnected("closed".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn panicking_handler_yields_500_envelope() {
        async fn explode() -> &'static str {
            panic!("watering can overflow")
        }

        let app = Router::new()
            .route("/explode", get(explode))
            .layer(CatchPanicLayer::custom(panic_response));

        let response = app
            .oneshot(Request::builder().uri("/explode").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "watering can overflow");
    }
}
