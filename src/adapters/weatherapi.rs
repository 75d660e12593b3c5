use crate::domain::model::{PlaceName, Temperature};
use crate::domain::ports::WeatherResolver;
use crate::utils::error::WeatherError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
struct WeatherApiResponse {
    current: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temp_c: f64,
}

pub struct WeatherApiResolver {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WeatherApiResolver {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn fetch(&self, place: &PlaceName) -> Result<Temperature, WeatherError> {
        tracing::debug!("🌡️ Fetching current weather for '{}'", place);

        // 地名由 query() 做 URL 編碼；錯誤訊息去掉 URL 以免 API key 出現在日誌
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", place.as_str()),
                ("aqi", "no"),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::fetch_failed(e.without_url()))?;

        let status = response.status();
        tracing::debug!("🌡️ Weather API response status: {}", status);
        if !status.is_success() {
            return Err(WeatherError::fetch_failed(format!(
                "weather API returned status {}",
                status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| WeatherError::fetch_failed(e.without_url()))?;
        let parsed: WeatherApiResponse =
            serde_json::from_slice(&body).map_err(WeatherError::fetch_failed)?;

        Ok(Temperature::from_celsius(parsed.current.temp_c))
    }
}

#[async_trait]
impl WeatherResolver for WeatherApiResolver {
    async fn resolve(
        &self,
        place: &PlaceName,
        cancel: &CancellationToken,
    ) -> Result<Temperature, WeatherError> {
        cancel
            .run_until_cancelled(self.fetch(place))
            .await
            .unwrap_or(Err(WeatherError::Cancelled))
    }
}
