use crate::adapters::build_http_client;
use crate::config::FrontendConfig;
use crate::domain::model::{LookupRequest, WeatherReport};
use crate::telemetry::{TraceContext, Tracer};
use crate::utils::error::{Result, ServiceError};
use http::HeaderMap;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// 前端流程：驗證輸入、帶著追蹤上下文呼叫後端、把結果原樣轉回
pub struct FrontendOrchestrator {
    client: Client,
    backend_url: String,
    tracer: Arc<dyn Tracer>,
    request_timeout: Duration,
}

impl FrontendOrchestrator {
    pub fn new(
        client: Client,
        backend_url: impl Into<String>,
        tracer: Arc<dyn Tracer>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            backend_url: backend_url.into(),
            tracer,
            request_timeout,
        }
    }

    pub fn from_config(config: &FrontendConfig, tracer: Arc<dyn Tracer>) -> Result<Self> {
        let client = build_http_client(config.request_timeout())?;
        Ok(Self::new(
            client,
            config.backend_url.clone(),
            tracer,
            config.request_timeout(),
        ))
    }

    pub fn extract_context(&self, headers: &HeaderMap) -> Option<TraceContext> {
        self.tracer.extract(headers)
    }

    /// Handles one raw client body. The `cep_lookup` span covers validation
    /// and the backend call and ends on every path.
    pub async fn lookup(
        &self,
        body: &[u8],
        parent: Option<&TraceContext>,
        cancel: &CancellationToken,
    ) -> Result<WeatherReport> {
        let mut span = self.tracer.start_span("cep_lookup", parent);
        let context = span.context().clone();

        let outcome = match LookupRequest::from_json(body) {
            Ok(request) => self.forward(&request, &context, cancel).await,
            Err(e) => {
                tracing::info!("🚫 Rejected lookup request: {}", e);
                Err(e)
            }
        };

        match &outcome {
            Ok(_) => span.end(),
            Err(e) => span.record_error(&e.to_string()),
        }
        outcome
    }

    /// Calls the backend with `context` injected, racing cancellation and the
    /// request deadline. Nothing from the backend is read once either fires.
    pub async fn forward(
        &self,
        request: &LookupRequest,
        context: &TraceContext,
        cancel: &CancellationToken,
    ) -> Result<WeatherReport> {
        let call = tokio::time::timeout(self.request_timeout, self.call_backend(request, context));

        match cancel.run_until_cancelled(call).await {
            None => {
                tracing::info!("🛑 Lookup for '{}' cancelled by caller", request.cep());
                Err(ServiceError::Cancelled)
            }
            Some(Err(_)) => {
                tracing::warn!(
                    "⏱️ Backend call for '{}' exceeded {:?}",
                    request.cep(),
                    self.request_timeout
                );
                Err(ServiceError::DeadlineExceeded)
            }
            Some(Ok(result)) => result,
        }
    }

    async fn call_backend(
        &self,
        request: &LookupRequest,
        context: &TraceContext,
    ) -> Result<WeatherReport> {
        let mut headers = HeaderMap::new();
        self.tracer.inject(context, &mut headers);

        tracing::debug!("📡 Forwarding '{}' to {}", request.cep(), self.backend_url);
        let response = self
            .client
            .get(&self.backend_url)
            .query(&[("cep", request.cep())])
            .headers(headers)
            .send()
            .await
            .map_err(|e| ServiceError::BackendUnavailable {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("📡 Backend answered {} for '{}'", status, request.cep());
            return Err(ServiceError::BackendStatus {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::BackendUnavailable {
                reason: e.to_string(),
            })?;

        serde_json::from_slice::<WeatherReport>(&body).map_err(|e| ServiceError::BackendDecode {
            reason: e.to_string(),
        })
    }
}
