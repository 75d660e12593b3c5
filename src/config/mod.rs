pub mod toml_config;

use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_socket_addr, validate_url,
    Validate,
};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_FRONTEND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_BACKEND_ADDR: &str = "0.0.0.0:8081";
pub const DEFAULT_BACKEND_URL: &str = "http://service-b:8081/temperatura";
pub const DEFAULT_LOCATION_URL: &str = "https://viacep.com.br/ws";
pub const DEFAULT_WEATHER_URL: &str = "https://api.weatherapi.com/v1/current.json";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_EXPORT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize, Args)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name reported on exported spans
    #[arg(long, env = "OTEL_SERVICE_NAME")]
    pub service_name: Option<String>,

    /// OTLP/HTTP traces endpoint, e.g. http://otel-collector:4318/v1/traces
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Upper bound for tracer start-up and each export call
    #[arg(long, env = "OTEL_EXPORT_TIMEOUT_MS", default_value_t = DEFAULT_EXPORT_TIMEOUT_MS)]
    pub export_timeout_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: None,
            otlp_endpoint: None,
            export_timeout_ms: DEFAULT_EXPORT_TIMEOUT_MS,
        }
    }
}

impl TelemetryConfig {
    pub fn export_timeout(&self) -> Duration {
        Duration::from_millis(self.export_timeout_ms)
    }

    pub fn service_name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.service_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(fallback)
    }
}

impl Validate for TelemetryConfig {
    fn validate(&self) -> Result<()> {
        if let Some(endpoint) = self.otlp_endpoint.as_deref().filter(|e| !e.is_empty()) {
            validate_url("otlp_endpoint", endpoint)?;
        }
        validate_positive_number("export_timeout_ms", self.export_timeout_ms, 1)?;
        Ok(())
    }
}

/// 前端服務設定
#[derive(Debug, Clone, Serialize, Deserialize, Args)]
#[serde(default)]
pub struct FrontendConfig {
    #[arg(long, env = "FRONTEND_LISTEN_ADDR", default_value = DEFAULT_FRONTEND_ADDR)]
    pub listen_addr: String,

    /// Backend lookup endpoint; the postal code is sent as `?cep=`
    #[arg(long, env = "BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// Deadline for the whole client request, backend call included
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_FRONTEND_ADDR.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl FrontendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Validate for FrontendConfig {
    fn validate(&self) -> Result<()> {
        validate_socket_addr("listen_addr", &self.listen_addr)?;
        validate_url("backend_url", &self.backend_url)?;
        validate_positive_number("request_timeout_ms", self.request_timeout_ms, 1)?;
        self.telemetry.validate()
    }
}

/// 後端服務設定
#[derive(Debug, Clone, Serialize, Deserialize, Args)]
#[serde(default)]
pub struct BackendConfig {
    #[arg(long, env = "BACKEND_LISTEN_ADDR", default_value = DEFAULT_BACKEND_ADDR)]
    pub listen_addr: String,

    /// Postal directory base URL; requests go to `{url}/{cep}/json/`
    #[arg(long, env = "VIACEP_URL", default_value = DEFAULT_LOCATION_URL)]
    pub location_url: String,

    /// Current-weather endpoint
    #[arg(long, env = "WEATHER_API_URL", default_value = DEFAULT_WEATHER_URL)]
    pub weather_url: String,

    #[arg(long, env = "WEATHER_API_KEY", hide_env_values = true, default_value = "")]
    #[serde(skip_serializing)]
    pub weather_api_key: String,

    /// Timeout applied to each upstream call
    #[arg(long, env = "UPSTREAM_TIMEOUT_MS", default_value_t = DEFAULT_UPSTREAM_TIMEOUT_MS)]
    pub upstream_timeout_ms: u64,

    /// Deadline for the whole lookup (both upstream calls)
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_BACKEND_ADDR.to_string(),
            location_url: DEFAULT_LOCATION_URL.to_string(),
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            weather_api_key: String::new(),
            upstream_timeout_ms: DEFAULT_UPSTREAM_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl BackendConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Validate for BackendConfig {
    fn validate(&self) -> Result<()> {
        validate_socket_addr("listen_addr", &self.listen_addr)?;
        validate_url("location_url", &self.location_url)?;
        validate_url("weather_url", &self.weather_url)?;
        validate_non_empty_string("weather_api_key", &self.weather_api_key)?;
        validate_positive_number("upstream_timeout_ms", self.upstream_timeout_ms, 1)?;
        validate_positive_number("request_timeout_ms", self.request_timeout_ms, 1)?;
        self.telemetry.validate()
    }
}
