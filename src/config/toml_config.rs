use crate::utils::error::{Result, ServiceError};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::path::Path;

/// 從 TOML 檔案載入設定（FrontendConfig 或 BackendConfig）
pub fn from_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let content = std::fs::read_to_string(&path).map_err(ServiceError::IoError)?;
    from_toml_str(&content)
}

/// 從 TOML 字串解析設定
pub fn from_toml_str<T: DeserializeOwned>(content: &str) -> Result<T> {
    let processed_content = substitute_env_vars(content)?;

    toml::from_str(&processed_content).map_err(|e| ServiceError::ConfigError {
        field: "toml_parsing".to_string(),
        message: format!("TOML parsing error: {}", e),
    })
}

/// 替換環境變數 (例如 ${WEATHER_API_KEY})，未設定的變數保持原樣
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ServiceError::ConfigError {
        field: "env_substitution".to_string(),
        message: e.to_string(),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}
