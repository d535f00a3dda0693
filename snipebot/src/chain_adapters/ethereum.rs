use crate::chain_adapters::interfaces::{
    BlockInfo, ChainClient, ChainError, SwapReceipt, SwapTransaction, TokenBalance,
};
use crate::endpoint_manager::EndpointConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

// Router Uniswap V2, chỉ các hàm cần dùng
abigen!(
    IUniswapV2Router02,
    r#"[
        function swapExactETHForTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external payable returns (uint256[] memory amounts)
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts)
    ]"#
);

// Giao diện ERC20 để đọc số dư token
abigen!(
    IERC20,
    r#"[
        function balanceOf(address owner) external view returns (uint256)
        function decimals() external view returns (uint8)
        function symbol() external view returns (string)
    ]"#
);

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Khoảng thời gian poll receipt mặc định
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

fn rpc_error(err: impl std::fmt::Display) -> ChainError {
    ChainError::from_message(err)
}

/// ChainClient dùng ethers qua HTTP cho một endpoint
#[derive(Debug)]
pub struct EthersChainClient {
    endpoint: EndpointConfig,
    provider: Arc<Provider<Http>>,
    signer: Option<Arc<SignerClient>>,
}

impl EthersChainClient {
    /// Tạo provider cho endpoint. Mọi request bị giới hạn bởi `rpc_timeout`.
    pub fn connect(endpoint: &EndpointConfig, rpc_timeout: Duration) -> Result<Self> {
        let url = Url::parse(&endpoint.url)
            .with_context(|| format!("Invalid RPC url for {}: {}", endpoint.name, endpoint.url))?;
        let http_client = reqwest::Client::builder()
            .timeout(rpc_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let provider = Provider::new(Http::new_with_client(url, http_client)).interval(RECEIPT_POLL_INTERVAL);

        debug!(endpoint = %endpoint.name, url = %endpoint.url, "Created RPC provider");

        Ok(Self {
            endpoint: endpoint.clone(),
            provider: Arc::new(provider),
            signer: None,
        })
    }

    /// Gắn ví ký giao dịch, chain id lấy theo endpoint
    pub fn with_wallet(mut self, wallet: LocalWallet) -> Self {
        let wallet = wallet.with_chain_id(self.endpoint.chain_id);
        let provider = self.provider.as_ref().clone();
        self.signer = Some(Arc::new(SignerMiddleware::new(provider, wallet)));
        self
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }
}

#[async_trait]
impl ChainClient for EthersChainClient {
    async fn block_number(&self) -> Result<u64, ChainError> {
        let number = self.provider.get_block_number().await.map_err(rpc_error)?;
        Ok(number.as_u64())
    }

    async fn block(&self, number: u64) -> Result<Option<BlockInfo>, ChainError> {
        let block = self
            .provider
            .get_block(BlockId::Number(BlockNumber::Number(U64::from(number))))
            .await
            .map_err(rpc_error)?;

        Ok(block.map(|block| BlockInfo {
            number: block.number.map(|n| n.as_u64()).unwrap_or(number),
            timestamp: block.timestamp.low_u64(),
        }))
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        self.provider.get_balance(address, None).await.map_err(rpc_error)
    }

    async fn transaction_count(&self, address: Address, include_pending: bool) -> Result<U256, ChainError> {
        let block = include_pending.then_some(BlockId::Number(BlockNumber::Pending));
        self.provider
            .get_transaction_count(address, block)
            .await
            .map_err(rpc_error)
    }

    async fn amounts_out(&self, router: Address, amount_in: U256, path: Vec<Address>) -> Result<Vec<U256>, ChainError> {
        let router = IUniswapV2Router02::new(router, Arc::clone(&self.provider));
        router
            .get_amounts_out(amount_in, path)
            .call()
            .await
            .map_err(rpc_error)
    }

    async fn send_swap(&self, tx: &SwapTransaction) -> Result<H256, ChainError> {
        let signer = self.signer.as_ref().ok_or(ChainError::WalletNotConfigured)?;
        let router = IUniswapV2Router02::new(tx.router, Arc::clone(signer));

        let mut call = router
            .swap_exact_eth_for_tokens(tx.amount_out_min, tx.path.clone(), tx.recipient, tx.deadline)
            .legacy();
        call.tx.set_value(tx.value);
        call.tx.set_gas(tx.gas_limit);
        call.tx.set_gas_price(tx.gas_price);
        call.tx.set_nonce(tx.nonce);

        let pending = call.send().await.map_err(rpc_error)?;
        Ok(pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<Option<SwapReceipt>, ChainError> {
        let receipt = PendingTransaction::new(tx_hash, self.provider.as_ref())
            .interval(RECEIPT_POLL_INTERVAL)
            .confirmations(1)
            .await
            .map_err(rpc_error)?;

        Ok(receipt.map(|receipt| SwapReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
            // Receipt trước Byzantium không có status
            success: receipt.status.map(|status| status.as_u64() == 1).unwrap_or(true),
            gas_used: receipt.gas_used,
        }))
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<TokenBalance, ChainError> {
        let contract = IERC20::new(token, Arc::clone(&self.provider));
        let raw = contract.balance_of(owner).call().await.map_err(rpc_error)?;
        let decimals = contract.decimals().call().await.map_err(rpc_error)?;
        let symbol = contract.symbol().call().await.map_err(rpc_error)?;

        Ok(TokenBalance { raw, decimals, symbol })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(url: &str) -> EndpointConfig {
        EndpointConfig {
            url: url.to_string(),
            chain_id: 1,
            name: "Ethereum (LlamaRPC)".to_string(),
        }
    }

    #[test]
    fn test_connect_rejects_invalid_url() {
        let result = EthersChainClient::connect(&endpoint("not a url"), Duration::from_secs(5));
        assert!(result.is_err());
    }

    #[test]
    fn test_connect_without_wallet_cannot_send() {
        let client = EthersChainClient::connect(&endpoint("https://eth.llamarpc.com"), Duration::from_secs(5)).unwrap();
        assert!(client.signer.is_none());
        assert_eq!(client.endpoint().chain_id, 1);
    }

    #[tokio::test]
    async fn test_send_without_wallet_fails_before_network() {
        let client = EthersChainClient::connect(&endpoint("http://127.0.0.1:9"), Duration::from_secs(1)).unwrap();
        let tx = SwapTransaction {
            router: Address::zero(),
            amount_out_min: U256::zero(),
            path: vec![Address::zero(), Address::repeat_byte(1)],
            recipient: Address::repeat_byte(2),
            deadline: U256::from(1u64),
            value: U256::from(1u64),
            gas_limit: U256::from(300_000u64),
            gas_price: U256::from(10_000_000_000u64),
            nonce: U256::zero(),
        };
        assert_eq!(client.send_swap(&tx).await, Err(ChainError::WalletNotConfigured));
    }

    #[tokio::test]
    #[ignore] // Bỏ qua trong CI vì cần kết nối internet
    async fn test_block_number_live() {
        let client = EthersChainClient::connect(&endpoint("https://eth.llamarpc.com"), Duration::from_secs(30)).unwrap();
        let number = client.block_number().await.unwrap();
        assert!(number > 0);
        let block = client.block(number).await.unwrap();
        assert!(block.is_some());
    }
}
