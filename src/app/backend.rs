//! Backend HTTP surface: `GET /temperatura?cep=...`.
//!
//! Every failure is turned into a fixed status + message pair here; upstream
//! detail only reaches the logs.

use crate::adapters::{build_http_client, viacep::ViaCepResolver, weatherapi::WeatherApiResolver};
use crate::app::health;
use crate::config::BackendConfig;
use crate::core::backend::BackendOrchestrator;
use crate::domain::model::{ErrorBody, WeatherReport};
use crate::domain::ports::{LocationResolver, WeatherResolver};
use crate::telemetry::Tracer;
use crate::utils::error::{Result, ServiceError};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

pub const TEMPERATURE_PATH: &str = "/temperatura";

/// Raw query pairs; a repeated `cep` keeps its first value.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct CepQuery(Vec<(String, String)>);

impl CepQuery {
    pub fn cep(&self) -> &str {
        self.0
            .iter()
            .find(|(key, _)| key == "cep")
            .map(|(_, value)| value.as_str())
            .unwrap_or_default()
    }
}

pub fn router<L, W>(orchestrator: Arc<BackendOrchestrator<L, W>>) -> Router
where
    L: LocationResolver + 'static,
    W: WeatherResolver + 'static,
{
    Router::new()
        .route(TEMPERATURE_PATH, get(temperature::<L, W>))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

/// 依設定組出 ViaCEP + WeatherAPI 的後端路由，兩個 resolver 共用同一個 client
pub fn from_config(config: &BackendConfig, tracer: Arc<dyn Tracer>) -> Result<Router> {
    let client = build_http_client(config.upstream_timeout())?;
    let location = ViaCepResolver::new(client.clone(), config.location_url.clone());
    let weather = WeatherApiResolver::new(
        client,
        config.weather_url.clone(),
        config.weather_api_key.clone(),
    );
    let orchestrator =
        BackendOrchestrator::new(location, weather, tracer, config.request_timeout());
    Ok(router(Arc::new(orchestrator)))
}

/// GET /temperatura - Resolve a postal code to the current temperature.
async fn temperature<L, W>(
    State(orchestrator): State<Arc<BackendOrchestrator<L, W>>>,
    headers: HeaderMap,
    query: std::result::Result<Query<CepQuery>, QueryRejection>,
) -> Response
where
    L: LocationResolver + 'static,
    W: WeatherResolver + 'static,
{
    // 客戶端斷線時 axum 會丟棄這個 future，守衛隨之取消所有進行中的上游呼叫
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    // 無法解析的查詢字串視同沒有 cep，交給驗證回 422
    let cep = query
        .map(|Query(query)| query.cep().to_string())
        .unwrap_or_default();

    let parent = orchestrator.extract_context(&headers);
    let trace_id = parent
        .as_ref()
        .map(|p| p.trace_id.clone())
        .unwrap_or_default();
    let span = tracing::info_span!("temperatura", cep = %cep, trace_id = %trace_id);

    async move {
        match orchestrator.lookup(&cep, parent.as_ref(), &cancel).await {
            Ok(result) => {
                let report = WeatherReport::from(result);
                tracing::info!(
                    "✅ {} → {} ({:.1}°C / {:.1}°F / {:.2}K)",
                    cep,
                    report.city,
                    report.temp_c,
                    report.temp_f,
                    report.temp_k
                );
                (StatusCode::OK, Json(report)).into_response()
            }
            Err(e) => error_response(&e),
        }
    }
    .instrument(span)
    .await
}

pub fn error_response(err: &ServiceError) -> Response {
    let (status, message) = match err {
        ServiceError::InvalidZipcode => (StatusCode::UNPROCESSABLE_ENTITY, "invalid zipcode"),
        ServiceError::ZipcodeNotFound(_) => (StatusCode::NOT_FOUND, "cannot find zipcode"),
        ServiceError::WeatherUnavailable(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "error fetching weather data",
        ),
        ServiceError::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, "request timed out"),
        other => {
            tracing::error!("❌ Unexpected backend failure: {}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    };
    (status, Json(ErrorBody::new(message))).into_response()
}
