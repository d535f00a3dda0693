use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

pub use snipe_common::error::ChainError;

/// Thông tin tối thiểu của một block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub number: u64,
    /// Unix timestamp (giây)
    pub timestamp: u64,
}

/// Giao dịch swapExactETHForTokens đã được điền đủ tham số
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapTransaction {
    pub router: Address,
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    pub recipient: Address,
    pub deadline: U256,
    pub value: U256,
    pub gas_limit: U256,
    pub gas_price: U256,
    pub nonce: U256,
}

/// Biên lai rút gọn của giao dịch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    /// false khi giao dịch bị revert on-chain
    pub success: bool,
    pub gas_used: Option<U256>,
}

/// Số dư ERC20 kèm metadata để hiển thị
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub raw: U256,
    pub decimals: u8,
    pub symbol: String,
}

/// Những gì engine cần từ một RPC endpoint.
///
/// Mỗi endpoint có một client riêng; ký giao dịch được xử lý bên trong client.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Block height hiện tại
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Block tại height cho trước, None nếu node không trả về
    async fn block(&self, number: u64) -> Result<Option<BlockInfo>, ChainError>;

    /// Số dư native token
    async fn balance(&self, address: Address) -> Result<U256, ChainError>;

    /// Transaction count, có tính các giao dịch pending nếu `include_pending`
    async fn transaction_count(&self, address: Address, include_pending: bool) -> Result<U256, ChainError>;

    /// Router.getAmountsOut (chỉ đọc)
    async fn amounts_out(&self, router: Address, amount_in: U256, path: Vec<Address>) -> Result<Vec<U256>, ChainError>;

    /// Ký và gửi giao dịch swap, trả về tx hash ngay khi node nhận
    async fn send_swap(&self, tx: &SwapTransaction) -> Result<H256, ChainError>;

    /// Chờ receipt; None nếu giao dịch bị drop khỏi mempool
    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<Option<SwapReceipt>, ChainError>;

    /// Số dư ERC20 của `owner`
    async fn token_balance(&self, token: Address, owner: Address) -> Result<TokenBalance, ChainError>;
}
