use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::types::{H256, U256};
use ethers::utils::format_ether;
use metrics::counter;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::NotifyTarget;

/// Các sự kiện engine báo ra ngoài
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnipeEvent {
    Started { endpoints: usize },
    EndpointRecovered { endpoint: String },
    EndpointDown { endpoint: String, reason: Option<String> },
    InsufficientBalance { required: U256, available: U256 },
    BalanceAvailable { balance: U256 },
    AttemptStarted { attempt: u32, max_retries: u32 },
    TransactionSent { attempt: u32, tx_hash: H256 },
    SwapConfirmed { tx_hash: H256 },
    AttemptFailed { attempt: u32, error: String },
    RetriesExhausted { max_retries: u32 },
    Fatal { message: String },
}

/// Loại sự kiện, không kèm dữ liệu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Started,
    EndpointRecovered,
    EndpointDown,
    InsufficientBalance,
    BalanceAvailable,
    AttemptStarted,
    TransactionSent,
    SwapConfirmed,
    AttemptFailed,
    RetriesExhausted,
    Fatal,
}

impl SnipeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SnipeEvent::Started { .. } => EventKind::Started,
            SnipeEvent::EndpointRecovered { .. } => EventKind::EndpointRecovered,
            SnipeEvent::EndpointDown { .. } => EventKind::EndpointDown,
            SnipeEvent::InsufficientBalance { .. } => EventKind::InsufficientBalance,
            SnipeEvent::BalanceAvailable { .. } => EventKind::BalanceAvailable,
            SnipeEvent::AttemptStarted { .. } => EventKind::AttemptStarted,
            SnipeEvent::TransactionSent { .. } => EventKind::TransactionSent,
            SnipeEvent::SwapConfirmed { .. } => EventKind::SwapConfirmed,
            SnipeEvent::AttemptFailed { .. } => EventKind::AttemptFailed,
            SnipeEvent::RetriesExhausted { .. } => EventKind::RetriesExhausted,
            SnipeEvent::Fatal { .. } => EventKind::Fatal,
        }
    }

    fn is_failure(&self) -> bool {
        matches!(
            self.kind(),
            EventKind::EndpointDown | EventKind::AttemptFailed | EventKind::RetriesExhausted | EventKind::Fatal
        )
    }
}

impl fmt::Display for SnipeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnipeEvent::Started { endpoints } => {
                write!(f, "🔄 Starting RPC monitor and sniper ({} endpoints)...", endpoints)
            }
            SnipeEvent::EndpointRecovered { endpoint } => {
                write!(f, "✅ {} is now functional! Attempting to snipe...", endpoint)
            }
            SnipeEvent::EndpointDown { endpoint, reason } => match reason {
                Some(reason) => write!(f, "❌ {} is no longer functional: {}", endpoint, reason),
                None => write!(f, "❌ {} is no longer functional", endpoint),
            },
            SnipeEvent::InsufficientBalance { required, available } => write!(
                f,
                "💸 Insufficient balance: have {} ETH, need {} ETH. Waiting for funds...",
                format_ether(*available),
                format_ether(*required)
            ),
            SnipeEvent::BalanceAvailable { balance } => {
                write!(f, "💰 Balance available: {} ETH", format_ether(*balance))
            }
            SnipeEvent::AttemptStarted { attempt, max_retries } => {
                write!(f, "🚀 Attempting swap {}/{}", attempt, max_retries)
            }
            SnipeEvent::TransactionSent { tx_hash, .. } => {
                write!(f, "📝 Transaction sent! Hash: {:?}", tx_hash)
            }
            SnipeEvent::SwapConfirmed { tx_hash } => {
                write!(f, "✅ Snipe successful! Transaction confirmed! Hash: {:?}", tx_hash)
            }
            SnipeEvent::AttemptFailed { attempt, error } => {
                write!(f, "❌ Swap attempt {} failed: {}", attempt, error)
            }
            SnipeEvent::RetriesExhausted { max_retries } => write!(
                f,
                "⚠️ Max retry attempts ({}) reached, monitoring RPC...",
                max_retries
            ),
            SnipeEvent::Fatal { message } => write!(f, "❌ Script error: {}", message),
        }
    }
}

/// Kênh gửi thông báo ra ngoài (ntfy, ...)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, message: &str) -> Result<()>;
}

/// Nơi engine phát sự kiện. Không bao giờ trả lỗi.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: SnipeEvent);
}

/// Gửi thông báo dạng text/plain tới một topic ntfy
#[derive(Debug, Clone)]
pub struct NtfyNotifier {
    client: Client,
    url: Url,
}

impl NtfyNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid notification url: {}", url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow!("Notification url must be http(s): {}", url));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build notification HTTP client")?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Notifier for NtfyNotifier {
    async fn deliver(&self, message: &str) -> Result<()> {
        self.client
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(message.to_string())
            .send()
            .await
            .context("Failed to send notification")?
            .error_for_status()
            .context("Notification endpoint rejected message")?;
        Ok(())
    }
}

/// Ghi log mọi sự kiện và chuyển tiếp tới notifier (nếu có).
/// Lỗi gửi chỉ được log lại, không lan ra ngoài.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    notifier: Option<Arc<dyn Notifier>>,
}

impl EventDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier: Some(notifier),
        }
    }

    /// Chỉ ghi log, không gửi thông báo
    pub fn log_only() -> Self {
        Self { notifier: None }
    }

    /// Dựng dispatcher từ kênh thông báo đã kiểm tra trong `RuntimeConfig`
    pub fn from_target(target: Option<&NotifyTarget>) -> Result<Self> {
        match target {
            Some(target) => Ok(Self::new(Arc::new(NtfyNotifier::new(&target.url, target.timeout)?))),
            None => Ok(Self::log_only()),
        }
    }

    pub fn is_notifying(&self) -> bool {
        self.notifier.is_some()
    }
}

#[async_trait]
impl EventSink for EventDispatcher {
    async fn emit(&self, event: SnipeEvent) {
        let message = event.to_string();
        if event.is_failure() {
            warn!(kind = ?event.kind(), "{}", message);
        } else {
            info!(kind = ?event.kind(), "{}", message);
        }

        let Some(notifier) = &self.notifier else {
            return;
        };

        match notifier.deliver(&message).await {
            Ok(()) => debug!("Notification sent successfully"),
            Err(err) => {
                counter!("snipebot_notifications_failed_total", 1);
                error!(error = %format!("{:#}", err), "Failed to send notification");
            }
        }
    }
}
