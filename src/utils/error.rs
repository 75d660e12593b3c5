use thiserror::Error;

/// 郵遞區號目錄查詢的失敗結果
#[derive(Error, Debug)]
pub enum LocationError {
    #[error("postal directory request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("postal directory returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("postal directory response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("postal directory has no place name for this code")]
    NotFound,

    #[error("postal directory request cancelled")]
    Cancelled,
}

/// 天氣查詢的失敗結果，呼叫端只需要區分「失敗」與「取消」
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("weather fetch failed: {reason}")]
    FetchFailed { reason: String },

    #[error("weather request cancelled")]
    Cancelled,
}

impl WeatherError {
    pub fn fetch_failed(reason: impl std::fmt::Display) -> Self {
        Self::FetchFailed {
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("invalid zipcode")]
    InvalidZipcode,

    #[error("cannot find zipcode: {0}")]
    ZipcodeNotFound(#[source] LocationError),

    #[error("error fetching weather data: {0}")]
    WeatherUnavailable(#[source] WeatherError),

    #[error("backend request failed: {reason}")]
    BackendUnavailable { reason: String },

    #[error("backend returned status {status}")]
    BackendStatus { status: u16 },

    #[error("backend response could not be decoded: {reason}")]
    BackendDecode { reason: String },

    #[error("request deadline exceeded")]
    DeadlineExceeded,

    #[error("request cancelled")]
    Cancelled,

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigError { field: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Telemetry error: {message}")]
    TelemetryError { message: String },
}

/// 對外回應時使用的錯誤分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Upstream,
    Internal,
    Cancelled,
}

impl ServiceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ServiceError::InvalidZipcode => ErrorCategory::Validation,
            ServiceError::ZipcodeNotFound(_) => ErrorCategory::NotFound,
            ServiceError::WeatherUnavailable(_)
            | ServiceError::BackendUnavailable { .. }
            | ServiceError::BackendStatus { .. }
            | ServiceError::BackendDecode { .. }
            | ServiceError::DeadlineExceeded => ErrorCategory::Upstream,
            ServiceError::Cancelled => ErrorCategory::Cancelled,
            ServiceError::Internal { .. }
            | ServiceError::ConfigError { .. }
            | ServiceError::IoError(_)
            | ServiceError::TelemetryError { .. } => ErrorCategory::Internal,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<LocationError> for ServiceError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::Cancelled => ServiceError::Cancelled,
            other => ServiceError::ZipcodeNotFound(other),
        }
    }
}

impl From<WeatherError> for ServiceError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::Cancelled => ServiceError::Cancelled,
            other => ServiceError::WeatherUnavailable(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
