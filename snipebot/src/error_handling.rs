use ethers::types::H256;
use std::fmt;
use thiserror::Error;

use crate::chain_adapters::ChainError;

/// Lỗi của một lần thử swap. Mọi biến thể đều được tính là một lần thử thất bại.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Failed to read balance: {0}")]
    Balance(ChainError),

    #[error("Quote failed: {0}")]
    Quote(ChainError),

    #[error("Quote failed: router returned no amounts")]
    EmptyQuote,

    #[error("Failed to fetch nonce: {0}")]
    Nonce(ChainError),

    #[error("Failed to send transaction: {0}")]
    Send(ChainError),

    #[error("Transaction {0:?} reverted")]
    Reverted(H256),

    #[error("Transaction {0:?} was dropped before confirmation")]
    Dropped(H256),

    #[error("Transaction {tx_hash:?} not confirmed after {timeout_secs}s")]
    ConfirmationTimeout { tx_hash: H256, timeout_secs: u64 },

    #[error("Failed to fetch receipt for {0:?}: {1}")]
    Receipt(H256, ChainError),
}

/// Bước trong một lần thử mà lỗi xảy ra
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    Balance,
    Quote,
    Nonce,
    Send,
    Confirmation,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Balance => "balance",
            FailureStage::Quote => "quote",
            FailureStage::Nonce => "nonce",
            FailureStage::Send => "send",
            FailureStage::Confirmation => "confirmation",
        };
        f.write_str(name)
    }
}

impl TransactionError {
    pub fn stage(&self) -> FailureStage {
        match self {
            TransactionError::Balance(_) => FailureStage::Balance,
            TransactionError::Quote(_) | TransactionError::EmptyQuote => FailureStage::Quote,
            TransactionError::Nonce(_) => FailureStage::Nonce,
            TransactionError::Send(_) => FailureStage::Send,
            TransactionError::Reverted(_)
            | TransactionError::Dropped(_)
            | TransactionError::ConfirmationTimeout { .. }
            | TransactionError::Receipt(..) => FailureStage::Confirmation,
        }
    }

    /// Hash của giao dịch đã gửi, nếu lỗi xảy ra sau khi gửi
    pub fn tx_hash(&self) -> Option<H256> {
        match self {
            TransactionError::Reverted(hash)
            | TransactionError::Dropped(hash)
            | TransactionError::Receipt(hash, _) => Some(*hash),
            TransactionError::ConfirmationTimeout { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }

    /// Lỗi nằm ở phía endpoint (kết nối, timeout, rate limit)
    pub fn is_transport(&self) -> bool {
        match self {
            TransactionError::Balance(err)
            | TransactionError::Quote(err)
            | TransactionError::Nonce(err)
            | TransactionError::Send(err)
            | TransactionError::Receipt(_, err) => err.is_transport(),
            _ => false,
        }
    }
}
