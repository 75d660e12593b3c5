//! OpenTelemetry-backed tracer and process-wide provider set-up.
//!
//! Trace context crosses the service hop through the global composite
//! propagator (W3C TraceContext + Baggage); spans are exported over
//! OTLP/HTTP when an endpoint is configured.

use super::{ActiveSpan, SpanHandle, TraceContext, Tracer};
use crate::config::TelemetryConfig;
use crate::utils::error::{Result, ServiceError};
use http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::{
    baggage::BaggageExt,
    global::{self, BoxedSpan, BoxedTracer},
    propagation::{Extractor, Injector, TextMapCompositePropagator},
    trace::{
        Span as _, SpanContext, SpanId, Status, TraceContextExt, TraceFlags, TraceId, TraceState,
        Tracer as _,
    },
    Context, KeyValue,
};
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::{
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{Sampler, SdkTracerProvider},
    Resource,
};
use std::collections::BTreeMap;

/// Adapter for extracting trace context from HTTP headers
struct HeadersExtractor<'a>(&'a HeaderMap);

impl Extractor for HeadersExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Adapter for injecting trace context into HTTP headers
struct HeadersInjector<'a>(&'a mut HeaderMap);

impl Injector for HeadersInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let Ok(name) = HeaderName::from_bytes(key.as_bytes()) {
            if let Ok(val) = HeaderValue::from_str(&value) {
                self.0.insert(name, val);
            }
        }
    }
}

fn to_otel_context(context: &TraceContext) -> Context {
    let trace_id = TraceId::from_hex(&context.trace_id).unwrap_or(TraceId::INVALID);
    let span_id = SpanId::from_hex(&context.span_id).unwrap_or(SpanId::INVALID);
    let flags = if context.sampled {
        TraceFlags::SAMPLED
    } else {
        TraceFlags::default()
    };

    let span_context = SpanContext::new(trace_id, span_id, flags, true, TraceState::default());
    let cx = Context::new().with_remote_span_context(span_context);
    if context.baggage.is_empty() {
        cx
    } else {
        cx.with_baggage(
            context
                .baggage
                .iter()
                .map(|(k, v)| KeyValue::new(k.clone(), v.clone())),
        )
    }
}

fn from_span_context(
    span_context: &SpanContext,
    baggage: BTreeMap<String, String>,
) -> Option<TraceContext> {
    if !span_context.is_valid() {
        return None;
    }
    Some(TraceContext {
        trace_id: format!("{:032x}", span_context.trace_id()),
        span_id: format!("{:016x}", span_context.span_id()),
        sampled: span_context.is_sampled(),
        baggage,
    })
}

struct OtelSpan(BoxedSpan);

impl SpanHandle for OtelSpan {
    fn record_error(&mut self, message: &str) {
        self.0.set_status(Status::error(message.to_string()));
    }

    fn end(&mut self) {
        self.0.end();
    }
}

/// [`Tracer`] on top of the global OpenTelemetry provider and propagator.
pub struct OtelTracer {
    tracer: BoxedTracer,
}

impl OtelTracer {
    /// Must be built after [`init_tracer_provider`] so it binds to the real provider.
    pub fn new(instrumentation_name: &'static str) -> Self {
        Self {
            tracer: global::tracer(instrumentation_name),
        }
    }
}

impl Tracer for OtelTracer {
    fn start_span(&self, name: &'static str, parent: Option<&TraceContext>) -> ActiveSpan {
        let parent_cx = parent.map(to_otel_context).unwrap_or_default();
        let span = self.tracer.start_with_context(name, &parent_cx);

        let baggage = parent.map(|p| p.baggage.clone()).unwrap_or_default();
        let context = from_span_context(span.span_context(), baggage)
            .unwrap_or_else(|| parent.cloned().unwrap_or_default());

        ActiveSpan::new(context, Box::new(OtelSpan(span)))
    }

    fn inject(&self, context: &TraceContext, headers: &mut HeaderMap) {
        let cx = to_otel_context(context);
        global::get_text_map_propagator(|propagator| {
            propagator.inject_context(&cx, &mut HeadersInjector(headers));
        });
    }

    fn extract(&self, headers: &HeaderMap) -> Option<TraceContext> {
        let cx = global::get_text_map_propagator(|propagator| {
            propagator.extract(&HeadersExtractor(headers))
        });

        let baggage = cx
            .baggage()
            .iter()
            .map(|(k, (v, _))| (k.as_str().to_string(), v.to_string()))
            .collect();
        let span = cx.span();
        from_span_context(span.span_context(), baggage)
    }
}

/// Keeps the provider alive; flush it with [`TelemetryGuard::shutdown`].
pub struct TelemetryGuard {
    provider: SdkTracerProvider,
}

impl TelemetryGuard {
    pub async fn shutdown(self) {
        let provider = self.provider;
        match tokio::task::spawn_blocking(move || provider.shutdown()).await {
            Ok(Ok(())) => tracing::info!("📡 Tracer provider flushed"),
            Ok(Err(e)) => tracing::warn!("⚠️ Tracer provider shutdown failed: {}", e),
            Err(e) => tracing::warn!("⚠️ Tracer provider shutdown task failed: {}", e),
        }
    }
}

pub fn install_propagator() {
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));
}

fn build_provider(cfg: &TelemetryConfig) -> Result<SdkTracerProvider> {
    let resource = Resource::builder_empty()
        .with_attributes(vec![KeyValue::new(
            "service.name",
            cfg.service_name_or("cep-weather").to_string(),
        )])
        .build();

    let mut builder = SdkTracerProvider::builder()
        .with_sampler(Sampler::AlwaysOn)
        .with_resource(resource);

    match cfg.otlp_endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(endpoint) => {
            tracing::info!("📡 Exporting spans over OTLP/HTTP to {}", endpoint);
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_protocol(Protocol::HttpBinary)
                .with_endpoint(endpoint)
                .with_timeout(cfg.export_timeout())
                .build()
                .map_err(|e| ServiceError::TelemetryError {
                    message: format!("failed to build OTLP exporter for {}: {}", endpoint, e),
                })?;
            builder = builder.with_batch_exporter(exporter);
        }
        None => tracing::info!("📡 No OTLP endpoint configured, spans are not exported"),
    }

    Ok(builder.build())
}

/// 安裝全域 propagator 與 tracer provider，啟動時間受 `export_timeout_ms` 限制
pub async fn init_tracer_provider(cfg: &TelemetryConfig) -> Result<TelemetryGuard> {
    install_propagator();

    let owned = cfg.clone();
    let build = tokio::task::spawn_blocking(move || build_provider(&owned));
    let provider = tokio::time::timeout(cfg.export_timeout(), build)
        .await
        .map_err(|_| ServiceError::TelemetryError {
            message: format!(
                "tracer provider start-up exceeded {} ms",
                cfg.export_timeout_ms
            ),
        })?
        .map_err(|e| ServiceError::TelemetryError {
            message: format!("tracer provider start-up task failed: {}", e),
        })??;

    global::set_tracer_provider(provider.clone());
    tracing::info!(
        "✅ Tracing initialised for service '{}'",
        cfg.service_name_or("cep-weather")
    );

    Ok(TelemetryGuard { provider })
}
