pub mod ethereum;
pub mod interfaces;
pub mod nonce_manager;

pub use ethereum::EthersChainClient;
pub use interfaces::{BlockInfo, ChainClient, ChainError, SwapReceipt, SwapTransaction, TokenBalance};
pub use nonce_manager::{NonceLease, NonceManager};
