// External imports
use ethers::types::{Address, U256};

// Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Internal imports
use crate::chain_adapters::{ChainClient, ChainError};
use crate::notifier::{EventSink, SnipeEvent};

// Third party imports
use tracing::debug;

/// Kết quả một lần kiểm tra số dư
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceCheck {
    /// Đủ tiền, kèm số dư hiện tại
    Sufficient(U256),
    /// Chưa đủ, kèm số dư hiện tại
    Waiting(U256),
}

/// Cổng chặn gửi giao dịch cho tới khi ví đủ tiền.
///
/// Chỉ báo `InsufficientBalance` một lần khi bắt đầu chờ và `BalanceAvailable`
/// một lần khi đủ tiền; các lần poll ở giữa không phát sự kiện.
pub struct BalanceGate {
    events: Arc<dyn EventSink>,
    poll_interval: Duration,
    waiting: bool,
}

impl BalanceGate {
    pub fn new(events: Arc<dyn EventSink>, poll_interval: Duration) -> Self {
        Self {
            events,
            poll_interval,
            waiting: false,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Đang trong trạng thái chờ tiền
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Đọc số dư một lần và cập nhật trạng thái chờ
    pub async fn check(
        &mut self,
        client: &dyn ChainClient,
        account: Address,
        required: U256,
    ) -> Result<BalanceCheck, ChainError> {
        let balance = client.balance(account).await?;

        if balance >= required {
            if self.waiting {
                self.waiting = false;
                self.events
                    .emit(SnipeEvent::BalanceAvailable { balance })
                    .await;
            }
            return Ok(BalanceCheck::Sufficient(balance));
        }

        if !self.waiting {
            self.waiting = true;
            self.events
                .emit(SnipeEvent::InsufficientBalance {
                    required,
                    available: balance,
                })
                .await;
        } else {
            debug!(balance = %balance, required = %required, "Still waiting for funds");
        }
        Ok(BalanceCheck::Waiting(balance))
    }

    /// Poll tới khi số dư >= `required`. Không tự timeout; lỗi đọc số dư được trả về ngay.
    pub async fn await_balance(
        &mut self,
        client: &dyn ChainClient,
        account: Address,
        required: U256,
    ) -> Result<U256, ChainError> {
        loop {
            match self.check(client, account, required).await? {
                BalanceCheck::Sufficient(balance) => return Ok(balance),
                BalanceCheck::Waiting(_) => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_adapters::{BlockInfo, SwapReceipt, SwapTransaction, TokenBalance};
    use async_trait::async_trait;
    use ethers::types::H256;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedBalances {
        balances: Mutex<VecDeque<Result<U256, ChainError>>>,
    }

    impl ScriptedBalances {
        fn new(balances: Vec<Result<U256, ChainError>>) -> Self {
            Self {
                balances: Mutex::new(balances.into()),
            }
        }
    }

    #[async_trait]
    impl ChainClient for ScriptedBalances {
        async fn block_number(&self) -> Result<u64, ChainError> {
            Ok(1)
        }
        async fn block(&self, _number: u64) -> Result<Option<BlockInfo>, ChainError> {
            Ok(None)
        }
        async fn balance(&self, _address: Address) -> Result<U256, ChainError> {
            self.balances
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ChainError::Unknown("script exhausted".into())))
        }
        async fn transaction_count(&self, _address: Address, _include_pending: bool) -> Result<U256, ChainError> {
            Ok(U256::zero())
        }
        async fn amounts_out(&self, _router: Address, _amount_in: U256, _path: Vec<Address>) -> Result<Vec<U256>, ChainError> {
            Ok(vec![])
        }
        async fn send_swap(&self, _tx: &SwapTransaction) -> Result<H256, ChainError> {
            Err(ChainError::WalletNotConfigured)
        }
        async fn wait_for_receipt(&self, _tx_hash: H256) -> Result<Option<SwapReceipt>, ChainError> {
            Ok(None)
        }
        async fn token_balance(&self, _token: Address, _owner: Address) -> Result<TokenBalance, ChainError> {
            Err(ChainError::Unknown("unused".into()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<SnipeEvent>>,
    }

    #[async_trait]
    impl EventSink for Recorder {
        async fn emit(&self, event: SnipeEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn test_sufficient_balance_emits_nothing() {
        let recorder = Arc::new(Recorder::default());
        let mut gate = BalanceGate::new(recorder.clone(), Duration::ZERO);
        let chain = ScriptedBalances::new(vec![Ok(U256::from(100))]);

        let balance = gate
            .await_balance(&chain, Address::zero(), U256::from(100))
            .await
            .unwrap();

        assert_eq!(balance, U256::from(100));
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_waiting_emits_once_each_way() {
        let recorder = Arc::new(Recorder::default());
        let mut gate = BalanceGate::new(recorder.clone(), Duration::ZERO);
        let chain = ScriptedBalances::new(vec![
            Ok(U256::from(1)),
            Ok(U256::from(2)),
            Ok(U256::from(3)),
            Ok(U256::from(500)),
        ]);

        let balance = gate
            .await_balance(&chain, Address::zero(), U256::from(100))
            .await
            .unwrap();

        assert_eq!(balance, U256::from(500));
        assert!(!gate.is_waiting());
        let events = recorder.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                SnipeEvent::InsufficientBalance {
                    required: U256::from(100),
                    available: U256::from(1)
                },
                SnipeEvent::BalanceAvailable {
                    balance: U256::from(500)
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_returned() {
        let recorder = Arc::new(Recorder::default());
        let mut gate = BalanceGate::new(recorder.clone(), Duration::ZERO);
        let chain = ScriptedBalances::new(vec![
            Ok(U256::from(1)),
            Err(ChainError::ConnectionError("connection refused".into())),
        ]);

        let result = gate.await_balance(&chain, Address::zero(), U256::from(100)).await;
        assert!(matches!(result, Err(ChainError::ConnectionError(_))));
        // Vẫn giữ trạng thái chờ, lần sau không báo lại InsufficientBalance
        assert!(gate.is_waiting());
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
    }
}
