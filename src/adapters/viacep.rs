use crate::domain::model::{PlaceName, PostalCode};
use crate::domain::ports::LocationResolver;
use crate::utils::error::LocationError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// ViaCEP 回應中只需要 `localidade`；查無資料時 ViaCEP 回 `{"erro": true}`
#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    localidade: Option<String>,
}

pub struct ViaCepResolver {
    client: Client,
    base_url: String,
}

impl ViaCepResolver {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, cep: &PostalCode) -> String {
        format!("{}/{}/json/", self.base_url.trim_end_matches('/'), cep)
    }

    async fn fetch(&self, cep: &PostalCode) -> Result<PlaceName, LocationError> {
        let endpoint = self.endpoint(cep);
        tracing::debug!("📮 Looking up postal code at: {}", endpoint);

        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(LocationError::Transport)?;

        let status = response.status();
        tracing::debug!("📮 Postal directory response status: {}", status);
        if !status.is_success() {
            return Err(LocationError::Status(status));
        }

        let body = response.bytes().await.map_err(LocationError::Transport)?;
        let parsed: ViaCepResponse = serde_json::from_slice(&body)?;

        parsed
            .localidade
            .and_then(PlaceName::new)
            .ok_or(LocationError::NotFound)
    }
}

#[async_trait]
impl LocationResolver for ViaCepResolver {
    async fn resolve(
        &self,
        cep: &PostalCode,
        cancel: &CancellationToken,
    ) -> Result<PlaceName, LocationError> {
        cancel
            .run_until_cancelled(self.fetch(cep))
            .await
            .unwrap_or(Err(LocationError::Cancelled))
    }
}
