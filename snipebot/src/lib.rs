// Diamondchain - Copyright (c) 2023

//! Theo dõi nhiều RPC endpoint, chọn endpoint còn sống và đồng bộ, rồi gửi
//! một lệnh swap với số lần thử giới hạn và thông báo qua ntfy.

// Public modules
pub mod balance_gate;
pub mod chain_adapters;
pub mod config;
pub mod endpoint_manager;
pub mod error_handling;
pub mod health_monitor;
pub mod notifier;
pub mod snipebot;
pub mod trade;

// Re-exports
pub use balance_gate::{BalanceCheck, BalanceGate};
pub use chain_adapters::{ChainClient, ChainError, EthersChainClient, NonceManager};
pub use config::{RuntimeConfig, SnipeSettings};
pub use endpoint_manager::{select_active, EndpointConfig, EndpointState, PoolMonitor};
pub use error_handling::{FailureStage, TransactionError};
pub use health_monitor::{probe, HealthSnapshot, ProbeFailure};
pub use notifier::{EventDispatcher, EventSink, Notifier, NtfyNotifier, SnipeEvent};
pub use snipebot::{RunOutcome, SnipeBot, TickOutcome};
pub use trade::{SubmissionEngine, SubmissionOutcome, SubmissionReport, SwapIntent};
