use crate::core::converter;
use crate::utils::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 後端使用的郵遞區號：必須剛好 8 個 ASCII 數字，不做任何正規化
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalCode(String);

impl PostalCode {
    pub const LEN: usize = 8;

    pub fn parse(raw: &str) -> Result<Self> {
        if raw.len() != Self::LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ServiceError::InvalidZipcode);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 前端收到的請求。前端只檢查「存在且長度至少 8」，比後端寬鬆
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    cep: String,
}

#[derive(Debug, Deserialize)]
struct CepPayload {
    cep: Option<String>,
}

impl LookupRequest {
    pub const MIN_LEN: usize = 8;

    pub fn new(cep: &str) -> Result<Self> {
        if cep.is_empty() || cep.chars().count() < Self::MIN_LEN {
            return Err(ServiceError::InvalidZipcode);
        }
        Ok(Self {
            cep: cep.to_string(),
        })
    }

    /// 解析 `{"cep": "..."}`，任何格式錯誤都視為無效郵遞區號
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let payload: CepPayload =
            serde_json::from_slice(body).map_err(|_| ServiceError::InvalidZipcode)?;
        match payload.cep {
            Some(cep) => Self::new(&cep),
            None => Err(ServiceError::InvalidZipcode),
        }
    }

    pub fn cep(&self) -> &str {
        &self.cep
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceName(String);

impl PlaceName {
    /// 空字串代表「找不到地名」，回傳 None 而不是空的 PlaceName
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        if name.is_empty() {
            None
        } else {
            Some(Self(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 以攝氏為準的溫度，華氏與克氏一律由轉換器推導
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature {
    celsius: f64,
}

impl Temperature {
    pub fn from_celsius(celsius: f64) -> Self {
        Self { celsius }
    }

    pub fn celsius(&self) -> f64 {
        self.celsius
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupResult {
    pub place: PlaceName,
    pub temperature: Temperature,
}

/// 兩個服務之間以及回給客戶端的 JSON 格式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    pub city: String,
    #[serde(rename = "temp_C")]
    pub temp_c: f64,
    #[serde(rename = "temp_F")]
    pub temp_f: f64,
    #[serde(rename = "temp_K")]
    pub temp_k: f64,
}

impl From<LookupResult> for WeatherReport {
    fn from(result: LookupResult) -> Self {
        let scales = converter::convert(result.temperature.celsius());
        Self {
            city: result.place.0,
            temp_c: scales.celsius,
            temp_f: scales.fahrenheit,
            temp_k: scales.kelvin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
