use crate::core::sync::SyncSettings;
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub store: StoreConfig,
    pub accounting: AccountingConfig,
    pub sync: Option<SyncSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub endpoint: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    /// 發票備註開頭的店名標籤
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingConfig {
    pub endpoint: String,
    pub api_id: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    pub statuses: Option<Vec<String>>,
    pub pacing_ms: Option<u64>,
    pub lookback_days: Option<i64>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SyncError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_KEY})
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("store.endpoint", &self.store.endpoint)?;
        validate_non_empty_string("store.consumer_key", &self.store.consumer_key)?;
        validate_non_empty_string("store.consumer_secret", &self.store.consumer_secret)?;

        validate_url("accounting.endpoint", &self.accounting.endpoint)?;
        validate_non_empty_string("accounting.api_id", &self.accounting.api_id)?;
        validate_non_empty_string("accounting.api_key", &self.accounting.api_key)?;

        if let Some(sync) = &self.sync {
            if let Some(pacing_ms) = sync.pacing_ms {
                validate_range("sync.pacing_ms", pacing_ms, 0, 60_000)?;
            }
            if let Some(lookback_days) = sync.lookback_days {
                validate_range("sync.lookback_days", lookback_days, 1, 365)?;
            }
            if let Some(statuses) = &sync.statuses {
                if statuses.is_empty() {
                    return Err(SyncError::InvalidConfigValueError {
                        field: "sync.statuses".to_string(),
                        value: "[]".to_string(),
                        reason: "At least one qualifying status is required".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// 轉成引擎用的同步設定；缺的欄位用預設值補
    pub fn sync_settings(&self) -> SyncSettings {
        let defaults = SyncSettings::default();
        let section = self.sync.as_ref();

        SyncSettings {
            store_label: self
                .store
                .label
                .clone()
                .unwrap_or(defaults.store_label),
            statuses: section
                .and_then(|s| s.statuses.clone())
                .unwrap_or(defaults.statuses),
            pacing: section
                .and_then(|s| s.pacing_ms)
                .map(std::time::Duration::from_millis)
                .unwrap_or(defaults.pacing),
            lookback_days: section
                .and_then(|s| s.lookback_days)
                .unwrap_or(defaults.lookback_days),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
