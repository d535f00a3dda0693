//! Fake ChainClient và EventSink dùng chung cho các integration test
#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use snipe_common::utils::current_timestamp;
use snipebot::chain_adapters::{BlockInfo, ChainClient, ChainError, SwapReceipt, SwapTransaction, TokenBalance};
use snipebot::endpoint_manager::{EndpointConfig, PoolMonitor};
use snipebot::notifier::{EventKind, EventSink, SnipeEvent};
use snipebot::trade::{RetrySettings, SubmissionEngine, SwapIntent};

/// Kịch bản receipt cho một giao dịch đã gửi
#[derive(Debug, Clone)]
pub enum ReceiptScript {
    Success,
    Reverted,
    Dropped,
    /// Không bao giờ có receipt
    Never,
    Error(ChainError),
}

#[derive(Debug)]
struct FakeState {
    healthy: bool,
    block_height: u64,
    block_age_secs: u64,
    missing_block: bool,
    balances: VecDeque<Result<U256, ChainError>>,
    last_balance: U256,
    quotes: VecDeque<Result<Vec<U256>, ChainError>>,
    send_results: VecDeque<Result<(), ChainError>>,
    receipts: VecDeque<ReceiptScript>,
    pending_nonce: u64,
    nonce_reads: Vec<u64>,
    quote_calls: u32,
    balance_reads: u32,
    sent: Vec<SwapTransaction>,
}

/// Một endpoint giả, điều khiển được từ test
#[derive(Debug)]
pub struct FakeChain {
    state: Mutex<FakeState>,
}

impl FakeChain {
    pub fn healthy() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                healthy: true,
                block_height: 19_000_000,
                block_age_secs: 0,
                missing_block: false,
                balances: VecDeque::new(),
                last_balance: U256::exp10(18),
                quotes: VecDeque::new(),
                send_results: VecDeque::new(),
                receipts: VecDeque::new(),
                pending_nonce: 0,
                nonce_reads: Vec::new(),
                quote_calls: 0,
                balance_reads: 0,
                sent: Vec::new(),
            }),
        })
    }

    pub fn down() -> Arc<Self> {
        let chain = Self::healthy();
        chain.set_healthy(false);
        chain
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.with_state(|state| state.healthy = healthy);
    }

    pub fn set_block_age(&self, age: Duration) {
        self.with_state(|state| state.block_age_secs = age.as_secs());
    }

    /// Node trả block height nhưng không trả block
    pub fn set_missing_block(&self, missing: bool) {
        self.with_state(|state| state.missing_block = missing);
    }

    pub fn set_pending_nonce(&self, nonce: u64) {
        self.with_state(|state| state.pending_nonce = nonce);
    }

    /// Các số dư trả về lần lượt; hết thì lặp lại giá trị cuối
    pub fn script_balances(&self, balances: Vec<u64>) {
        self.with_state(|state| {
            state.balances = balances.into_iter().map(|balance| Ok(U256::from(balance))).collect();
        });
    }

    pub fn push_balance_error(&self, err: ChainError) {
        self.with_state(|state| state.balances.push_back(Err(err)));
    }

    pub fn push_quote(&self, quote: Result<Vec<U256>, ChainError>) {
        self.with_state(|state| state.quotes.push_back(quote));
    }

    /// Mọi lần quote tiếp theo đều lỗi
    pub fn fail_quotes(&self, count: usize) {
        for _ in 0..count {
            self.push_quote(Err(ChainError::ContractCallError("execution reverted".to_string())));
        }
    }

    pub fn push_send_result(&self, result: Result<(), ChainError>) {
        self.with_state(|state| state.send_results.push_back(result));
    }

    pub fn push_receipt(&self, receipt: ReceiptScript) {
        self.with_state(|state| state.receipts.push_back(receipt));
    }

    pub fn sent(&self) -> Vec<SwapTransaction> {
        self.with_state(|state| state.sent.clone())
    }

    pub fn sent_nonces(&self) -> Vec<u64> {
        self.with_state(|state| state.sent.iter().map(|tx| tx.nonce.as_u64()).collect())
    }

    pub fn nonce_reads(&self) -> Vec<u64> {
        self.with_state(|state| state.nonce_reads.clone())
    }

    pub fn quote_calls(&self) -> u32 {
        self.with_state(|state| state.quote_calls)
    }

    pub fn balance_reads(&self) -> u32 {
        self.with_state(|state| state.balance_reads)
    }

    fn check_reachable(&self) -> Result<(), ChainError> {
        if self.with_state(|state| state.healthy) {
            Ok(())
        } else {
            Err(ChainError::ConnectionError("connection refused".to_string()))
        }
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn block_number(&self) -> Result<u64, ChainError> {
        self.check_reachable()?;
        Ok(self.with_state(|state| state.block_height))
    }

    async fn block(&self, number: u64) -> Result<Option<BlockInfo>, ChainError> {
        self.check_reachable()?;
        let (age, missing) = self.with_state(|state| (state.block_age_secs, state.missing_block));
        if missing {
            return Ok(None);
        }
        Ok(Some(BlockInfo {
            number,
            timestamp: current_timestamp().saturating_sub(age),
        }))
    }

    async fn balance(&self, _address: Address) -> Result<U256, ChainError> {
        self.check_reachable()?;
        self.with_state(|state| {
            state.balance_reads += 1;
            match state.balances.pop_front() {
                Some(Ok(balance)) => {
                    state.last_balance = balance;
                    Ok(balance)
                }
                Some(Err(err)) => Err(err),
                None => Ok(state.last_balance),
            }
        })
    }

    async fn transaction_count(&self, _address: Address, include_pending: bool) -> Result<U256, ChainError> {
        assert!(include_pending, "nonce must be read with the pending tag");
        self.check_reachable()?;
        self.with_state(|state| {
            state.nonce_reads.push(state.pending_nonce);
            Ok(U256::from(state.pending_nonce))
        })
    }

    async fn amounts_out(&self, _router: Address, amount_in: U256, _path: Vec<Address>) -> Result<Vec<U256>, ChainError> {
        self.check_reachable()?;
        self.with_state(|state| {
            state.quote_calls += 1;
            state
                .quotes
                .pop_front()
                .unwrap_or_else(|| Ok(vec![amount_in, U256::from(1_000_000u64)]))
        })
    }

    async fn send_swap(&self, tx: &SwapTransaction) -> Result<H256, ChainError> {
        self.check_reachable()?;
        self.with_state(|state| {
            if let Some(Err(err)) = state.send_results.pop_front() {
                return Err(err);
            }
            assert_eq!(
                tx.nonce,
                U256::from(state.pending_nonce),
                "transaction must use the current pending nonce"
            );
            state.sent.push(tx.clone());
            state.pending_nonce += 1;
            Ok(H256::from_low_u64_be(state.sent.len() as u64))
        })
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<Option<SwapReceipt>, ChainError> {
        let script = self.with_state(|state| state.receipts.pop_front().unwrap_or(ReceiptScript::Success));
        let receipt = |success| SwapReceipt {
            tx_hash,
            block_number: Some(19_000_001),
            success,
            gas_used: Some(U256::from(150_000u64)),
        };
        match script {
            ReceiptScript::Success => Ok(Some(receipt(true))),
            ReceiptScript::Reverted => Ok(Some(receipt(false))),
            ReceiptScript::Dropped => Ok(None),
            ReceiptScript::Never => std::future::pending().await,
            ReceiptScript::Error(err) => Err(err),
        }
    }

    async fn token_balance(&self, _token: Address, _owner: Address) -> Result<TokenBalance, ChainError> {
        self.check_reachable()?;
        Ok(TokenBalance {
            raw: U256::from(1_500_000u64),
            decimals: 6,
            symbol: "USDC".to_string(),
        })
    }
}

/// EventSink ghi lại mọi sự kiện
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SnipeEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SnipeEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(SnipeEvent::kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events().iter().filter(|event| event.kind() == kind).count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: SnipeEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn account() -> Address {
    Address::repeat_byte(0xac)
}

pub fn endpoint(name: &str) -> EndpointConfig {
    EndpointConfig {
        url: format!("https://{}.example", name.to_lowercase()),
        chain_id: 1,
        name: name.to_string(),
    }
}

pub fn intent() -> SwapIntent {
    SwapIntent {
        router: Address::repeat_byte(0x7a),
        input_amount: U256::from(5_000u64),
        token_path: vec![Address::repeat_byte(0xc0), Address::repeat_byte(0xa0)],
        slippage_bps: 5_000,
        deadline_offset_secs: 120,
        gas_limit: U256::from(100u64),
        gas_price: U256::from(10u64),
    }
}

/// Không nghỉ giữa các lần thử, timeout xác nhận ngắn
pub fn fast_retry() -> RetrySettings {
    RetrySettings {
        retry_delay: Duration::ZERO,
        confirmation_timeout: Duration::from_millis(200),
    }
}

pub fn engine(sink: &Arc<RecordingSink>) -> SubmissionEngine {
    SubmissionEngine::new(account(), intent(), fast_retry(), sink.clone())
}

pub fn monitor(chains: &[(&str, Arc<FakeChain>)], sink: &Arc<RecordingSink>) -> PoolMonitor {
    let pool = chains
        .iter()
        .map(|(name, chain)| {
            let client: Arc<dyn ChainClient> = chain.clone();
            (endpoint(name), client)
        })
        .collect();
    PoolMonitor::new(pool, Duration::from_secs(300), sink.clone())
}
