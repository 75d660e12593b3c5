use cep_weather::app::{backend, frontend, server};
use cep_weather::telemetry::recording::{RecordedSpan, RecordingTracer};
use cep_weather::telemetry::CANCELLED;
use cep_weather::{BackendConfig, FrontendConfig};
use httpmock::prelude::*;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const UPSTREAM_DELAY: Duration = Duration::from_secs(5);

async fn spawn(router: axum::Router) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(server::serve_with_shutdown(listener, router, async {
        let _ = stopped.await;
    }));
    (addr, stop)
}

async fn slow_upstreams() -> (MockServer, BackendConfig) {
    let upstreams = MockServer::start_async().await;
    upstreams
        .mock_async(|when, then| {
            when.method(GET).path("/ws/01001000/json/");
            then.status(200)
                .delay(UPSTREAM_DELAY)
                .json_body(serde_json::json!({"localidade": "São Paulo"}));
        })
        .await;
    let config = BackendConfig {
        location_url: upstreams.url("/ws"),
        weather_url: upstreams.url("/v1/current.json"),
        weather_api_key: "test-key".to_string(),
        ..BackendConfig::default()
    };
    (upstreams, config)
}

/// Polls until `name` has ended, giving up well before the upstream delay.
async fn wait_for_end(tracer: &RecordingTracer, name: &str) -> RecordedSpan {
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Some(span) = tracer.span(name).filter(|s| s.ended) {
            return span;
        }
        assert!(Instant::now() < deadline, "span '{}' never ended", name);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn impatient_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_disconnect_aborts_backend_upstream_call() {
    let (_upstreams, config) = slow_upstreams().await;
    let tracer = RecordingTracer::new();
    let (addr, stop) = spawn(backend::from_config(&config, Arc::new(tracer.clone())).unwrap()).await;

    let started = Instant::now();
    let result = impatient_client()
        .get(format!("http://{}/temperatura?cep=01001000", addr))
        .send()
        .await;
    assert!(result.unwrap_err().is_timeout());

    let location = wait_for_end(&tracer, "resolve_location").await;
    assert!(started.elapsed() < UPSTREAM_DELAY);
    assert_eq!(location.error.as_deref(), Some(CANCELLED));

    let handler = wait_for_end(&tracer, "weather_lookup").await;
    assert_eq!(handler.error.as_deref(), Some(CANCELLED));
    assert!(tracer.span("resolve_weather").is_none());

    let _ = stop.send(());
}

#[tokio::test]
async fn test_disconnect_at_front_reaches_backend() {
    let (_upstreams, config) = slow_upstreams().await;
    let tracer = RecordingTracer::new();
    let (back_addr, stop_back) =
        spawn(backend::from_config(&config, Arc::new(tracer.clone())).unwrap()).await;

    let front_config = FrontendConfig {
        backend_url: format!("http://{}/temperatura", back_addr),
        ..FrontendConfig::default()
    };
    let (front_addr, stop_front) =
        spawn(frontend::from_config(&front_config, Arc::new(tracer.clone())).unwrap()).await;

    let started = Instant::now();
    let result = impatient_client()
        .post(format!("http://{}/", front_addr))
        .json(&serde_json::json!({"cep": "01001000"}))
        .send()
        .await;
    assert!(result.unwrap_err().is_timeout());

    let front_span = wait_for_end(&tracer, "cep_lookup").await;
    assert_eq!(front_span.error.as_deref(), Some(CANCELLED));

    let location = wait_for_end(&tracer, "resolve_location").await;
    assert!(started.elapsed() < UPSTREAM_DELAY);
    assert_eq!(location.error.as_deref(), Some(CANCELLED));

    let _ = stop_front.send(());
    let _ = stop_back.send(());
}
