// Adapters layer: HTTP clients for the external postal directory and weather API.

pub mod viacep;
pub mod weatherapi;

use crate::utils::error::{Result, ServiceError};
use reqwest::Client;
use std::time::Duration;

/// 建立共用的 HTTP client，所有上游呼叫都套用同一個逾時
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ServiceError::internal(format!("failed to build HTTP client: {}", e)))
}
