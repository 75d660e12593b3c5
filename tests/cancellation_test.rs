use cep_weather::adapters::{viacep::ViaCepResolver, weatherapi::WeatherApiResolver};
use cep_weather::telemetry::recording::RecordingTracer;
use cep_weather::{BackendOrchestrator, FrontendOrchestrator, LookupRequest, ServiceError, Tracer};
use httpmock::prelude::*;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn cancel_after(delay: Duration) -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        trigger.cancel();
    });
    cancel
}

#[tokio::test]
async fn test_cancelled_backend_lookup_never_reaches_weather() {
    let upstreams = MockServer::start_async().await;
    upstreams
        .mock_async(|when, then| {
            when.method(GET).path("/ws/01001000/json/");
            then.status(200)
                .delay(Duration::from_secs(5))
                .json_body(serde_json::json!({"localidade": "São Paulo"}));
        })
        .await;
    let weather = upstreams
        .mock_async(|when, then| {
            when.method(GET).path("/v1/current.json");
            then.status(200)
                .json_body(serde_json::json!({"current": {"temp_c": 25.0}}));
        })
        .await;

    let tracer = RecordingTracer::new();
    let client = Client::new();
    let orchestrator = BackendOrchestrator::new(
        ViaCepResolver::new(client.clone(), upstreams.url("/ws")),
        WeatherApiResolver::new(client, upstreams.url("/v1/current.json"), "test-key"),
        Arc::new(tracer.clone()),
        Duration::from_secs(10),
    );

    let started = Instant::now();
    let result = orchestrator
        .lookup("01001000", None, &cancel_after(Duration::from_millis(100)))
        .await;

    assert!(matches!(result, Err(ServiceError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(weather.hits_async().await, 0);

    let span = tracer.span("weather_lookup").unwrap();
    assert!(span.ended);
    assert!(span.error.is_some());
}

#[tokio::test]
async fn test_cancelled_forward_returns_without_backend_answer() {
    let backend = MockServer::start_async().await;
    backend
        .mock_async(|when, then| {
            when.method(GET).path("/temperatura");
            then.status(200)
                .delay(Duration::from_secs(5))
                .json_body(serde_json::json!({
                    "city": "São Paulo",
                    "temp_C": 25.0,
                    "temp_F": 77.0,
                    "temp_K": 298.15
                }));
        })
        .await;

    let tracer = RecordingTracer::new();
    let front = FrontendOrchestrator::new(
        Client::new(),
        backend.url("/temperatura"),
        Arc::new(tracer.clone()),
        Duration::from_secs(10),
    );
    let request = LookupRequest::new("01001000").unwrap();
    let span = tracer.start_span("cep_lookup", None);

    let started = Instant::now();
    let result = front
        .forward(&request, span.context(), &cancel_after(Duration::from_millis(100)))
        .await;

    assert!(matches!(result, Err(ServiceError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_already_cancelled_token_skips_upstreams() {
    let upstreams = MockServer::start_async().await;
    let any = upstreams
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200);
        })
        .await;

    let client = Client::new();
    let orchestrator = BackendOrchestrator::new(
        ViaCepResolver::new(client.clone(), upstreams.url("/ws")),
        WeatherApiResolver::new(client, upstreams.url("/v1/current.json"), "test-key"),
        Arc::new(RecordingTracer::new()),
        Duration::from_secs(10),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = orchestrator.lookup("01001000", None, &cancel).await;

    assert!(matches!(result, Err(ServiceError::Cancelled)));
    assert_eq!(any.hits_async().await, 0);
}
