// External imports
use ethers::types::{Address, H256, U256};
use metrics::counter;

// Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Internal imports
use crate::balance_gate::{BalanceCheck, BalanceGate};
use crate::chain_adapters::{ChainClient, NonceManager};
use crate::error_handling::TransactionError;
use crate::notifier::{EventSink, SnipeEvent};
use crate::trade::swap_intent::SwapIntent;
use snipe_common::utils::current_timestamp;

// Third party imports
use tracing::{debug, info, warn};

/// Thời gian nghỉ mặc định giữa hai lần thử
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
/// Thời gian chờ receipt tối đa mặc định
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Nghỉ cố định giữa các lần thử (không tăng dần)
    pub retry_delay: Duration,
    pub confirmation_timeout: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

/// Kết quả cuối của một lần gọi `attempt`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Confirmed(H256),
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Pending,
    Sent,
    Confirmed,
    Failed,
}

/// Nhật ký của một lần thử, chỉ tồn tại trong một lần gọi `attempt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
    pub tx_hash: Option<H256>,
    pub nonce: Option<U256>,
    pub error_message: Option<String>,
    /// Lỗi do endpoint (kết nối, timeout, rate limit) chứ không do giao dịch
    pub transport_error: bool,
}

impl AttemptRecord {
    fn new(attempt_number: u32) -> Self {
        Self {
            attempt_number,
            outcome: AttemptOutcome::Pending,
            tx_hash: None,
            nonce: None,
            error_message: None,
            transport_error: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub outcome: SubmissionOutcome,
    pub attempts: Vec<AttemptRecord>,
}

impl SubmissionReport {
    /// Số giao dịch đã được node nhận
    pub fn sends(&self) -> usize {
        self.attempts.iter().filter(|record| record.tx_hash.is_some()).count()
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.outcome, SubmissionOutcome::Confirmed(_))
    }
}

/// Các trạng thái của vòng thử
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Starting(u32),
    AwaitingFunds(u32),
    Attempting(u32),
    Backoff(u32),
    Finished(SubmissionOutcome),
}

/// Gửi swap với số lần thử giới hạn trên một endpoint đã chọn.
///
/// Mỗi lần thử: (chờ đủ tiền) -> quote -> tính min output và deadline -> lấy
/// nonce pending -> gửi -> chờ receipt. Bất kỳ bước nào lỗi đều tính là một lần
/// thử thất bại; engine không bao giờ gửi quá `max_retries` giao dịch trong
/// một lần gọi `attempt`.
pub struct SubmissionEngine {
    account: Address,
    intent: SwapIntent,
    retry: RetrySettings,
    balance_gate: Option<BalanceGate>,
    nonces: NonceManager,
    events: Arc<dyn EventSink>,
}

impl SubmissionEngine {
    pub fn new(account: Address, intent: SwapIntent, retry: RetrySettings, events: Arc<dyn EventSink>) -> Self {
        Self {
            account,
            intent,
            retry,
            balance_gate: None,
            nonces: NonceManager::new(account),
            events,
        }
    }

    /// Bật kiểm tra số dư trước mỗi lần thử
    pub fn with_balance_gate(mut self, poll_interval: Duration) -> Self {
        self.balance_gate = Some(BalanceGate::new(Arc::clone(&self.events), poll_interval));
        self
    }

    pub async fn attempt(&mut self, client: &dyn ChainClient, max_retries: u32) -> SubmissionReport {
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut state = if max_retries == 0 {
            EngineState::Finished(SubmissionOutcome::Exhausted)
        } else {
            EngineState::Starting(1)
        };

        loop {
            state = match state {
                EngineState::Starting(attempt) => {
                    info!(attempt, max_retries, account = ?self.account, "Swap attempt");
                    self.events
                        .emit(SnipeEvent::AttemptStarted { attempt, max_retries })
                        .await;
                    attempts.push(AttemptRecord::new(attempt));

                    if self.balance_gate.is_some() {
                        EngineState::AwaitingFunds(attempt)
                    } else {
                        EngineState::Attempting(attempt)
                    }
                }

                EngineState::AwaitingFunds(attempt) => match self.check_funds(client).await {
                    Ok(BalanceCheck::Sufficient(_)) => EngineState::Attempting(attempt),
                    Ok(BalanceCheck::Waiting(_)) => {
                        let poll_interval = self
                            .balance_gate
                            .as_ref()
                            .map(BalanceGate::poll_interval)
                            .unwrap_or_default();
                        tokio::time::sleep(poll_interval).await;
                        EngineState::AwaitingFunds(attempt)
                    }
                    Err(err) => {
                        let record = current_record(&mut attempts, attempt);
                        self.fail_attempt(record, err, max_retries).await
                    }
                },

                EngineState::Attempting(attempt) => {
                    let record = current_record(&mut attempts, attempt);
                    match self.execute(client, record).await {
                        Ok(tx_hash) => {
                            record.outcome = AttemptOutcome::Confirmed;
                            counter!("snipebot_attempts_total", 1, "outcome" => "confirmed");
                            info!(attempt, tx_hash = ?tx_hash, "Transaction confirmed");
                            self.events.emit(SnipeEvent::SwapConfirmed { tx_hash }).await;
                            EngineState::Finished(SubmissionOutcome::Confirmed(tx_hash))
                        }
                        Err(err) => self.fail_attempt(record, err, max_retries).await,
                    }
                }

                EngineState::Backoff(next) => {
                    debug!(delay_ms = self.retry.retry_delay.as_millis() as u64, next, "Waiting before next attempt");
                    tokio::time::sleep(self.retry.retry_delay).await;
                    EngineState::Starting(next)
                }

                EngineState::Finished(outcome) => {
                    return SubmissionReport { outcome, attempts };
                }
            };
        }
    }

    async fn check_funds(&mut self, client: &dyn ChainClient) -> Result<BalanceCheck, TransactionError> {
        let required = self.intent.max_cost();
        match self.balance_gate.as_mut() {
            Some(gate) => gate
                .check(client, self.account, required)
                .await
                .map_err(TransactionError::Balance),
            None => Ok(BalanceCheck::Sufficient(U256::zero())),
        }
    }

    /// Một lần thử, từ quote tới receipt
    async fn execute(&self, client: &dyn ChainClient, record: &mut AttemptRecord) -> Result<H256, TransactionError> {
        let amounts = client
            .amounts_out(self.intent.router, self.intent.input_amount, self.intent.token_path.clone())
            .await
            .map_err(TransactionError::Quote)?;
        let quoted = amounts.last().copied().ok_or(TransactionError::EmptyQuote)?;

        let amount_out_min = self.intent.minimum_output(quoted);
        let deadline = self.intent.deadline(current_timestamp());
        debug!(quoted = %quoted, amount_out_min = %amount_out_min, deadline = %deadline, "Quote received");

        // Lấy nonce và gửi trong cùng critical section
        let lease = self.nonces.lease(client).await.map_err(TransactionError::Nonce)?;
        let nonce = lease.nonce();
        record.nonce = Some(nonce);
        info!(nonce = %nonce, "Using nonce");

        let tx = self
            .intent
            .build_transaction(self.account, amount_out_min, deadline, nonce);
        let tx_hash = match client.send_swap(&tx).await {
            Ok(tx_hash) => {
                lease.mark_sent();
                tx_hash
            }
            Err(err) => return Err(TransactionError::Send(err)),
        };

        record.tx_hash = Some(tx_hash);
        record.outcome = AttemptOutcome::Sent;
        info!(tx_hash = ?tx_hash, nonce = %nonce, "Transaction sent");
        self.events
            .emit(SnipeEvent::TransactionSent {
                attempt: record.attempt_number,
                tx_hash,
            })
            .await;

        let timeout = self.retry.confirmation_timeout;
        match tokio::time::timeout(timeout, client.wait_for_receipt(tx_hash)).await {
            Err(_) => Err(TransactionError::ConfirmationTimeout {
                tx_hash,
                timeout_secs: timeout.as_secs(),
            }),
            Ok(Err(err)) => Err(TransactionError::Receipt(tx_hash, err)),
            Ok(Ok(None)) => Err(TransactionError::Dropped(tx_hash)),
            Ok(Ok(Some(receipt))) if !receipt.success => Err(TransactionError::Reverted(tx_hash)),
            Ok(Ok(Some(receipt))) => {
                debug!(block = ?receipt.block_number, gas_used = ?receipt.gas_used, "Receipt");
                Ok(tx_hash)
            }
        }
    }

    async fn fail_attempt(&self, record: &mut AttemptRecord, err: TransactionError, max_retries: u32) -> EngineState {
        let attempt = record.attempt_number;
        record.outcome = AttemptOutcome::Failed;
        record.error_message = Some(err.to_string());
        record.transport_error = err.is_transport();

        counter!("snipebot_attempts_total", 1, "outcome" => "failed");
        warn!(
            attempt,
            stage = %err.stage(),
            tx_hash = ?err.tx_hash(),
            transport = record.transport_error,
            error = %err,
            "Swap attempt failed"
        );
        self.events
            .emit(SnipeEvent::AttemptFailed {
                attempt,
                error: err.to_string(),
            })
            .await;

        if attempt >= max_retries {
            warn!(max_retries, "Max retry attempts reached");
            self.events.emit(SnipeEvent::RetriesExhausted { max_retries }).await;
            EngineState::Finished(SubmissionOutcome::Exhausted)
        } else {
            EngineState::Backoff(attempt + 1)
        }
    }
}

/// Bản ghi của lần thử hiện tại (luôn là phần tử cuối)
fn current_record(attempts: &mut Vec<AttemptRecord>, attempt: u32) -> &mut AttemptRecord {
    if attempts.last().map(|record| record.attempt_number) != Some(attempt) {
        attempts.push(AttemptRecord::new(attempt));
    }
    let last = attempts.len() - 1;
    &mut attempts[last]
}
