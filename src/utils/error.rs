use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Order {order_id} failed validation: {message}")]
    OrderValidationError { order_id: u64, message: String },

    #[error("Division by zero: {context}")]
    DivisionByZero { context: String },

    #[error(
        "Reconciliation invariant violated for order {order_id}: \
         subtotal {subtotal} + tax {tax} + rounding {rounding} != source total {source_total}"
    )]
    ReconciliationMismatch {
        order_id: u64,
        subtotal: Decimal,
        tax: Decimal,
        rounding: Decimal,
        source_total: Decimal,
    },

    #[error("Duplicate detection failed: {message}")]
    DuplicateCheckError { message: String },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// 可忽略的問題，流程照常結束
    Low,
    /// 暫時性錯誤，重試可能成功
    Medium,
    /// 單筆訂單失敗
    High,
    /// 系統性錯誤，必須人工介入
    Critical,
}

impl SyncError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SyncError::ApiError(_) => ErrorSeverity::Medium,
            SyncError::SerializationError(_) => ErrorSeverity::High,
            SyncError::IoError(_) => ErrorSeverity::High,
            SyncError::ConfigValidationError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::MissingConfigError { .. } => ErrorSeverity::Critical,
            SyncError::OrderValidationError { .. } => ErrorSeverity::High,
            SyncError::DivisionByZero { .. } => ErrorSeverity::High,
            // 對帳不變量被破壞代表建模錯誤，絕不能當成一般警告
            SyncError::ReconciliationMismatch { .. } => ErrorSeverity::Critical,
            SyncError::DuplicateCheckError { .. } => ErrorSeverity::Critical,
            SyncError::ProcessingError { .. } => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            SyncError::ApiError(_) => {
                "Check network connectivity and API credentials, then retry".to_string()
            }
            SyncError::SerializationError(_) => {
                "The remote API returned an unexpected payload shape".to_string()
            }
            SyncError::IoError(_) => "Check file permissions and paths".to_string(),
            SyncError::ConfigValidationError { field, .. }
            | SyncError::MissingConfigError { field } => {
                format!("Fix the '{}' entry in the configuration file", field)
            }
            SyncError::InvalidConfigValueError { field, .. } => {
                format!("Fix the '{}' entry in the configuration file", field)
            }
            SyncError::OrderValidationError { order_id, .. } => {
                format!("Inspect order {} in the storefront admin", order_id)
            }
            SyncError::DivisionByZero { .. } => {
                "Check catalog reference prices for zero values".to_string()
            }
            SyncError::ReconciliationMismatch { order_id, .. } => format!(
                "Do not resubmit order {}; report this as a reconciliation bug",
                order_id
            ),
            SyncError::DuplicateCheckError { .. } => {
                "Verify the accounting API is reachable before rerunning the batch".to_string()
            }
            SyncError::ProcessingError { .. } => "Rerun the batch".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SyncError::ApiError(_) => "An external API call failed".to_string(),
            SyncError::ReconciliationMismatch { order_id, .. } => {
                format!("Internal totals mismatch while invoicing order {}", order_id)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
