use crate::domain::model::{LookupResult, PostalCode};
use crate::domain::ports::{LocationResolver, WeatherResolver};
use crate::telemetry::{TraceContext, Tracer};
use crate::utils::error::{Result, ServiceError};
use http::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// 後端查詢流程：郵遞區號 → 地名 → 溫度，兩個上游呼叫嚴格依序執行
pub struct BackendOrchestrator<L: LocationResolver, W: WeatherResolver> {
    location: L,
    weather: W,
    tracer: Arc<dyn Tracer>,
    request_timeout: Duration,
}

impl<L: LocationResolver, W: WeatherResolver> BackendOrchestrator<L, W> {
    pub fn new(location: L, weather: W, tracer: Arc<dyn Tracer>, request_timeout: Duration) -> Self {
        Self {
            location,
            weather,
            tracer,
            request_timeout,
        }
    }

    pub fn extract_context(&self, headers: &HeaderMap) -> Option<TraceContext> {
        self.tracer.extract(headers)
    }

    /// Runs the whole lookup under one `weather_lookup` span, bounded by the
    /// request deadline. Dropping the returned future or cancelling `cancel`
    /// aborts whichever upstream call is in flight.
    pub async fn lookup(
        &self,
        raw_cep: &str,
        parent: Option<&TraceContext>,
        cancel: &CancellationToken,
    ) -> Result<LookupResult> {
        let mut span = self.tracer.start_span("weather_lookup", parent);
        let context = span.context().clone();

        let outcome =
            match tokio::time::timeout(self.request_timeout, self.run(raw_cep, &context, cancel))
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        "⏱️ Lookup for '{}' exceeded {:?}",
                        raw_cep,
                        self.request_timeout
                    );
                    Err(ServiceError::DeadlineExceeded)
                }
            };

        match &outcome {
            Ok(_) => span.end(),
            Err(e) => span.record_error(&e.to_string()),
        }
        outcome
    }

    async fn run(
        &self,
        raw_cep: &str,
        context: &TraceContext,
        cancel: &CancellationToken,
    ) -> Result<LookupResult> {
        let cep = PostalCode::parse(raw_cep).inspect_err(|_| {
            tracing::info!("🚫 Rejected postal code '{}'", raw_cep);
        })?;

        let place = {
            let mut span = self.tracer.start_span("resolve_location", Some(context));
            match self.location.resolve(&cep, cancel).await {
                Ok(place) => {
                    span.end();
                    place
                }
                Err(e) => {
                    tracing::warn!("📮 Location lookup for {} failed: {}", cep, e);
                    span.record_error(&e.to_string());
                    return Err(e.into());
                }
            }
        };
        tracing::info!("📮 {} resolved to '{}'", cep, place);

        let temperature = {
            let mut span = self.tracer.start_span("resolve_weather", Some(context));
            match self.weather.resolve(&place, cancel).await {
                Ok(temperature) => {
                    span.end();
                    temperature
                }
                Err(e) => {
                    tracing::warn!("🌡️ Weather lookup for '{}' failed: {}", place, e);
                    span.record_error(&e.to_string());
                    return Err(e.into());
                }
            }
        };
        tracing::info!("🌡️ '{}' is {:.1}°C", place, temperature.celsius());

        Ok(LookupResult { place, temperature })
    }
}
