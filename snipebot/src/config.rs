use config::{Config, Environment, File, FileFormat};
use dotenv::dotenv;
use ethers::signers::LocalWallet;
use ethers::types::{Address, U256};
use ethers::utils::{parse_ether, parse_units};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use snipe_common::error::ConfigError;

use crate::endpoint_manager::EndpointConfig;
use crate::trade::swap_intent::BPS_DENOMINATOR;
use crate::trade::{RetrySettings, SwapIntent};

/// File cấu hình mặc định, không bắt buộc phải có
pub const DEFAULT_CONFIG_FILE: &str = "snipebot.toml";
/// Tiền tố biến môi trường, ví dụ SNIPEBOT_RETRY__MAX_RETRIES=3
pub const ENV_PREFIX: &str = "SNIPEBOT";
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractSettings {
    pub router: String,
    pub wrapped_native: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapSettings {
    /// Lượng ETH bỏ vào, dạng thập phân ("0.005")
    pub amount_eth: String,
    pub slippage_bps: u32,
    pub deadline_secs: u64,
    pub gas_limit: u64,
    pub gas_price_gwei: String,
}

impl Default for SwapSettings {
    fn default() -> Self {
        Self {
            amount_eth: "0.005".to_string(),
            slippage_bps: 5_000,
            deadline_secs: 120,
            gas_limit: 500_000,
            gas_price_gwei: "20".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub poll_interval_ms: u64,
    pub stale_threshold_secs: u64,
    pub rpc_timeout_secs: u64,
    pub confirmation_timeout_secs: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            stale_threshold_secs: 300,
            rpc_timeout_secs: 30,
            confirmation_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceSettings {
    pub enabled: bool,
    pub poll_interval_ms: u64,
}

impl Default for BalanceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    pub enabled: bool,
    pub ntfy_url: String,
    pub timeout_secs: u64,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ntfy_url: "https://ntfy.sh/absnipe".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Cấu hình thô đọc từ file + môi trường
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnipeSettings {
    /// Danh sách endpoint theo thứ tự ưu tiên
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
    pub contracts: ContractSettings,
    #[serde(default)]
    pub swap: SwapSettings,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub balance: BalanceSettings,
    #[serde(default)]
    pub notify: NotifySettings,
}

/// Cấu hình đã kiểm tra, dùng trực tiếp để dựng bot
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub endpoints: Vec<EndpointConfig>,
    pub intent: SwapIntent,
    pub token: Address,
    pub retry: RetrySettings,
    pub max_retries: u32,
    pub poll_interval: Duration,
    pub stale_threshold: Duration,
    pub rpc_timeout: Duration,
    /// None khi tắt kiểm tra số dư
    pub balance_poll_interval: Option<Duration>,
    pub notify: Option<NotifyTarget>,
}

/// Kênh ntfy đã kiểm tra; None trong `RuntimeConfig` nghĩa là chỉ ghi log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyTarget {
    pub url: String,
    pub timeout: Duration,
}

impl SnipeSettings {
    /// Đọc `.env`, file cấu hình (nếu có) rồi biến môi trường SNIPEBOT_*.
    /// Khi `path` được chỉ định thì file phải tồn tại.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv().ok();

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Kiểm tra và chuyển đơn vị. Mọi lỗi ở đây đều là lỗi khởi động.
    pub fn validate(&self) -> Result<RuntimeConfig, ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::Missing("endpoints".to_string()));
        }
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            let url = url::Url::parse(&endpoint.url)
                .map_err(|err| ConfigError::invalid(format!("endpoints[{}].url", index), err))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::invalid(
                    format!("endpoints[{}].url", index),
                    "only http(s) endpoints are supported",
                ));
            }
            if endpoint.name.trim().is_empty() {
                return Err(ConfigError::Missing(format!("endpoints[{}].name", index)));
            }
        }

        let router = parse_address("contracts.router", &self.contracts.router)?;
        let wrapped_native = parse_address("contracts.wrapped_native", &self.contracts.wrapped_native)?;
        let token = parse_address("contracts.token", &self.contracts.token)?;

        let input_amount = parse_ether(self.swap.amount_eth.trim())
            .map_err(|err| ConfigError::invalid("swap.amount_eth", err))?;
        if input_amount.is_zero() {
            return Err(ConfigError::invalid("swap.amount_eth", "must be greater than zero"));
        }
        let gas_price: U256 = parse_units(self.swap.gas_price_gwei.trim(), "gwei")
            .map_err(|err| ConfigError::invalid("swap.gas_price_gwei", err))?
            .into();
        if self.swap.slippage_bps > BPS_DENOMINATOR {
            return Err(ConfigError::invalid(
                "swap.slippage_bps",
                format!("must be <= {}", BPS_DENOMINATOR),
            ));
        }
        if self.swap.gas_limit == 0 {
            return Err(ConfigError::invalid("swap.gas_limit", "must be greater than zero"));
        }
        if self.retry.max_retries == 0 {
            return Err(ConfigError::invalid("retry.max_retries", "must be at least 1"));
        }
        if self.monitor.confirmation_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "monitor.confirmation_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.monitor.rpc_timeout_secs == 0 {
            return Err(ConfigError::invalid("monitor.rpc_timeout_secs", "must be greater than zero"));
        }

        let notify = if self.notify.enabled {
            let url = url::Url::parse(&self.notify.ntfy_url)
                .map_err(|err| ConfigError::invalid("notify.ntfy_url", err))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::invalid("notify.ntfy_url", "must be an http(s) url"));
            }
            Some(NotifyTarget {
                url: url.to_string(),
                timeout: Duration::from_secs(self.notify.timeout_secs),
            })
        } else {
            None
        };

        Ok(RuntimeConfig {
            endpoints: self.endpoints.clone(),
            intent: SwapIntent {
                router,
                input_amount,
                token_path: vec![wrapped_native, token],
                slippage_bps: self.swap.slippage_bps,
                deadline_offset_secs: self.swap.deadline_secs,
                gas_limit: U256::from(self.swap.gas_limit),
                gas_price,
            },
            token,
            retry: RetrySettings {
                retry_delay: Duration::from_millis(self.retry.retry_delay_ms),
                confirmation_timeout: Duration::from_secs(self.monitor.confirmation_timeout_secs),
            },
            max_retries: self.retry.max_retries,
            poll_interval: Duration::from_millis(self.monitor.poll_interval_ms),
            stale_threshold: Duration::from_secs(self.monitor.stale_threshold_secs),
            rpc_timeout: Duration::from_secs(self.monitor.rpc_timeout_secs),
            balance_poll_interval: self
                .balance
                .enabled
                .then(|| Duration::from_millis(self.balance.poll_interval_ms)),
            notify,
        })
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(field.to_string()));
    }
    Address::from_str(value).map_err(|err| ConfigError::invalid(field, err))
}

/// Đọc ví từ biến PRIVATE_KEY (tiền tố 0x không bắt buộc)
pub fn load_wallet() -> Result<LocalWallet, ConfigError> {
    let key = env::var(PRIVATE_KEY_ENV).map_err(|_| ConfigError::Missing(PRIVATE_KEY_ENV.to_string()))?;
    parse_private_key(&key)
}

pub fn parse_private_key(key: &str) -> Result<LocalWallet, ConfigError> {
    let key = key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    if key.is_empty() {
        return Err(ConfigError::Missing(PRIVATE_KEY_ENV.to_string()));
    }
    // Không đưa nội dung key vào thông báo lỗi
    LocalWallet::from_str(key).map_err(|_| ConfigError::invalid(PRIVATE_KEY_ENV, "not a valid secp256k1 private key"))
}
