use ethers::types::{Address, U256};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::chain_adapters::interfaces::{ChainClient, ChainError};

/// Quản lý nonce cho một ví.
///
/// Nonce luôn được đọc lại từ chain (tính cả pending) ngay trước khi gửi, không
/// cache giữa các lần thử: một giao dịch trước đó có thể đã bị drop chứ không
/// bị từ chối. Việc lấy nonce và gửi giao dịch nằm trong cùng một critical
/// section, giữ bởi `NonceLease`.
#[derive(Debug)]
pub struct NonceManager {
    address: Address,
    /// Nonce của giao dịch gần nhất đã được node nhận
    last_sent: Arc<Mutex<Option<U256>>>,
}

/// Nonce đã cấp cho một lần gửi. Lock chỉ được nhả khi lease bị drop.
#[derive(Debug)]
pub struct NonceLease {
    nonce: U256,
    guard: OwnedMutexGuard<Option<U256>>,
}

impl NonceLease {
    pub fn nonce(&self) -> U256 {
        self.nonce
    }

    /// Đánh dấu nonce đã được dùng cho một giao dịch node đã nhận
    pub fn mark_sent(mut self) {
        *self.guard = Some(self.nonce);
    }
}

impl NonceManager {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            last_sent: Arc::new(Mutex::new(None)),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Lấy nonce tiếp theo từ chain, giữ lock tới khi lease bị drop
    pub async fn lease(&self, client: &dyn ChainClient) -> Result<NonceLease, ChainError> {
        let guard = Arc::clone(&self.last_sent).lock_owned().await;
        let nonce = client.transaction_count(self.address, true).await?;

        match *guard {
            Some(last) if nonce <= last => {
                // Giao dịch trước chưa thấy trong pending của endpoint này (bị drop hoặc node chậm)
                warn!(
                    address = ?self.address,
                    nonce = %nonce,
                    last_sent = %last,
                    "Pending nonce did not advance past last sent transaction"
                );
            }
            _ => debug!(address = ?self.address, nonce = %nonce, "Using nonce"),
        }

        Ok(NonceLease { nonce, guard })
    }

    pub async fn last_sent(&self) -> Option<U256> {
        *self.last_sent.lock().await
    }
}
