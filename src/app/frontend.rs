//! Frontend HTTP surface: `POST /` with `{"cep": "..."}`.

use crate::app::health;
use crate::config::FrontendConfig;
use crate::core::frontend::FrontendOrchestrator;
use crate::domain::model::ErrorBody;
use crate::telemetry::Tracer;
use crate::utils::error::{Result, ServiceError};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

pub fn router(orchestrator: Arc<FrontendOrchestrator>) -> Router {
    Router::new()
        .route("/", post(lookup))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

pub fn from_config(config: &FrontendConfig, tracer: Arc<dyn Tracer>) -> Result<Router> {
    let orchestrator = FrontendOrchestrator::from_config(config, tracer)?;
    Ok(router(Arc::new(orchestrator)))
}

/// POST / - Validate the code and relay the backend's report.
async fn lookup(
    State(orchestrator): State<Arc<FrontendOrchestrator>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let parent = orchestrator.extract_context(&headers);
    let trace_id = parent
        .as_ref()
        .map(|p| p.trace_id.clone())
        .unwrap_or_default();
    let span = tracing::info_span!("lookup", bytes = body.len(), trace_id = %trace_id);

    async move {
        match orchestrator.lookup(&body, parent.as_ref(), &cancel).await {
            Ok(report) => (StatusCode::OK, Json(report)).into_response(),
            Err(e) => error_response(&e),
        }
    }
    .instrument(span)
    .await
}

/// Only validation failures are distinguishable to the client.
pub fn error_response(err: &ServiceError) -> Response {
    let (status, message) = match err {
        ServiceError::InvalidZipcode => (StatusCode::UNPROCESSABLE_ENTITY, "invalid zipcode"),
        other => {
            tracing::error!(
                "❌ Lookup failed ({:?}): {}",
                other.category(),
                other
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    };
    (status, Json(ErrorBody::new(message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::recording::RecordingTracer;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use httpmock::prelude::*;
    use tower::ServiceExt;

    fn front_router(backend_url: String) -> Router {
        let config = FrontendConfig {
            backend_url,
            ..FrontendConfig::default()
        };
        from_config(&config, Arc::new(RecordingTracer::new())).unwrap()
    }

    async fn post_json(router: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_relays_report() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/temperatura").query_param("cep", "01001000");
                then.status(200).json_body(serde_json::json!({
                    "city": "São Paulo",
                    "temp_C": 25.0,
                    "temp_F": 77.0,
                    "temp_K": 298.15
                }));
            })
            .await;

        let (status, body) =
            post_json(front_router(server.url("/temperatura")), r#"{"cep":"01001000"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["city"], "São Paulo");
        assert_eq!(body["temp_C"], 25.0);
        assert_eq!(body["temp_F"], 77.0);
        assert_eq!(body["temp_K"], 298.15);
    }

    #[tokio::test]
    async fn test_invalid_zipcode() {
        let server = MockServer::start_async().await;
        let backend = server
            .mock_async(|when, then| {
                when.method(GET).path("/temperatura");
                then.status(200);
            })
            .await;

        for payload in [r#"{"cep":"123"}"#, r#"{}"#, "not json"] {
            let (status, body) = post_json(front_router(server.url("/temperatura")), payload).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", payload);
            assert_eq!(body["message"], "invalid zipcode");
        }
        assert_eq!(backend.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_backend_rejection_is_internal_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/temperatura");
                then.status(422)
                    .json_body(serde_json::json!({"message": "invalid zipcode"}));
            })
            .await;

        let (status, body) =
            post_json(front_router(server.url("/temperatura")), r#"{"cep":"0100100a"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "internal server error");
    }

    #[tokio::test]
    async fn test_get_is_not_routed() {
        let response = front_router("http://127.0.0.1:1/temperatura".to_string())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
