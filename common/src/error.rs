// Standard library imports
use std::fmt::Display;

// Third party imports
use thiserror::Error;

/// Lỗi khi tương tác với một RPC endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Không kết nối được tới RPC
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Request quá thời gian chờ
    #[error("Request timed out: {0}")]
    TimeoutError(String),

    /// RPC giới hạn tần suất
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Nonce bị từ chối (quá thấp, đã dùng...)
    #[error("Nonce error: {0}")]
    NonceError(String),

    /// Ví không đủ số dư để trả value + gas
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Giá gas quá thấp
    #[error("Transaction underpriced: {0}")]
    Underpriced(String),

    /// Contract call bị revert hoặc decode thất bại
    #[error("Contract call error: {0}")]
    ContractCallError(String),

    /// Chưa cấu hình ví ký giao dịch
    #[error("Wallet not configured")]
    WalletNotConfigured,

    /// Lỗi không xác định
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ChainError {
    /// Phân loại lỗi từ chuỗi thông báo của provider
    pub fn from_message(message: impl Display) -> Self {
        let message = message.to_string();
        let lowered = message.to_lowercase();

        if lowered.contains("timed out") || lowered.contains("timeout") {
            ChainError::TimeoutError(message)
        } else if lowered.contains("rate limit") || lowered.contains("429") || lowered.contains("too many requests") {
            ChainError::RateLimitExceeded(message)
        } else if lowered.contains("nonce") {
            ChainError::NonceError(message)
        } else if lowered.contains("insufficient funds") || lowered.contains("insufficient balance") {
            ChainError::InsufficientBalance(message)
        } else if lowered.contains("underpriced") || lowered.contains("gas price") {
            ChainError::Underpriced(message)
        } else if lowered.contains("revert") || lowered.contains("decode") {
            ChainError::ContractCallError(message)
        } else if lowered.contains("connect")
            || lowered.contains("connection")
            || lowered.contains("error sending request")
            || lowered.contains("dns")
            || lowered.contains("unavailable")
            || lowered.contains("bad gateway")
        {
            ChainError::ConnectionError(message)
        } else {
            ChainError::Unknown(message)
        }
    }

    /// Lỗi do endpoint không phản hồi (khác với lỗi do giao dịch)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ChainError::ConnectionError(_) | ChainError::TimeoutError(_) | ChainError::RateLimitExceeded(_)
        )
    }
}

/// Lỗi cấu hình, luôn dừng chương trình trước khi vào vòng lặp chính
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Thiếu giá trị bắt buộc
    #[error("Missing setting: {0}")]
    Missing(String),

    /// Giá trị không hợp lệ
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    /// Không đọc được file/biến môi trường
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Display) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// Module tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_transport_errors() {
        let err = ChainError::from_message("error sending request for url (https://rpc): operation timed out");
        assert!(matches!(err, ChainError::TimeoutError(_)));
        assert!(err.is_transport());

        let err = ChainError::from_message("tcp connect error: Connection refused (os error 111)");
        assert!(matches!(err, ChainError::ConnectionError(_)));
        assert!(err.is_transport());

        let err = ChainError::from_message("(code: 429, message: Too Many Requests)");
        assert!(matches!(err, ChainError::RateLimitExceeded(_)));
    }

    #[test]
    fn test_classify_submission_errors() {
        assert!(matches!(
            ChainError::from_message("nonce too low"),
            ChainError::NonceError(_)
        ));
        assert!(matches!(
            ChainError::from_message("insufficient funds for gas * price + value"),
            ChainError::InsufficientBalance(_)
        ));
        assert!(matches!(
            ChainError::from_message("replacement transaction underpriced"),
            ChainError::Underpriced(_)
        ));
        let err = ChainError::from_message("execution reverted: UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT");
        assert!(matches!(err, ChainError::ContractCallError(_)));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("swap.slippage_bps", "must be <= 10000");
        assert_eq!(err.to_string(), "Invalid value for swap.slippage_bps: must be <= 10000");
        assert_eq!(
            ConfigError::Missing("PRIVATE_KEY".to_string()).to_string(),
            "Missing setting: PRIVATE_KEY"
        );
    }
}
