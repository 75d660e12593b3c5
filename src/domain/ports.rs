use crate::domain::model::{PlaceName, PostalCode, Temperature};
use crate::utils::error::{LocationError, WeatherError};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// 郵遞區號 → 地名。每次呼叫只打一次上游，不重試也不快取
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(
        &self,
        cep: &PostalCode,
        cancel: &CancellationToken,
    ) -> Result<PlaceName, LocationError>;
}

/// 地名 → 目前攝氏溫度
#[async_trait]
pub trait WeatherResolver: Send + Sync {
    async fn resolve(
        &self,
        place: &PlaceName,
        cancel: &CancellationToken,
    ) -> Result<Temperature, WeatherError>;
}
