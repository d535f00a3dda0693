// External imports
use ethers::types::H256;

// Standard library imports
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

// Internal imports
use crate::endpoint_manager::{select_active, PoolMonitor};
use crate::notifier::{EventSink, SnipeEvent};
use crate::trade::{SubmissionEngine, SubmissionOutcome};

// Third party imports
use tracing::{debug, info, warn};

/// Chu kỳ kiểm tra mặc định giữa hai tick
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Kết quả một chu kỳ của bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Không endpoint nào khỏe, không gửi gì
    NoHealthyEndpoint,
    /// Đã thử hết số lần trên endpoint này
    Exhausted { endpoint: String },
    Confirmed { endpoint: String, tx_hash: H256 },
}

/// Kết quả của `run`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Confirmed { endpoint: String, tx_hash: H256 },
    /// Nhận tín hiệu dừng giữa hai chu kỳ
    Shutdown,
}

/// Vòng lặp chính: tick pool monitor, chọn endpoint, chạy submission engine.
/// Dừng ngay khi có một giao dịch được xác nhận.
pub struct SnipeBot {
    monitor: PoolMonitor,
    engine: SubmissionEngine,
    events: Arc<dyn EventSink>,
    max_retries: u32,
    poll_interval: Duration,
    active: Option<usize>,
    confirmed: Option<H256>,
}

impl SnipeBot {
    pub fn new(
        monitor: PoolMonitor,
        engine: SubmissionEngine,
        events: Arc<dyn EventSink>,
        max_retries: u32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            monitor,
            engine,
            events,
            max_retries,
            poll_interval,
            active: None,
            confirmed: None,
        }
    }

    /// Endpoint đang được dùng (theo tick gần nhất)
    pub fn active_endpoint(&self) -> Option<&str> {
        self.active
            .and_then(|index| self.monitor.config(index))
            .map(|config| config.name.as_str())
    }

    pub fn monitor(&self) -> &PoolMonitor {
        &self.monitor
    }

    /// Một chu kỳ: probe mọi endpoint, nếu có endpoint khỏe thì chạy engine với
    /// số lần thử mới. Sau khi đã xác nhận thành công thì không gửi thêm gì nữa.
    pub async fn tick_once(&mut self) -> TickOutcome {
        if let Some(tx_hash) = self.confirmed {
            let endpoint = self.active_endpoint().unwrap_or_default().to_string();
            debug!(tx_hash = ?tx_hash, "Swap already confirmed, skipping tick");
            return TickOutcome::Confirmed { endpoint, tx_hash };
        }

        let snapshots = self.monitor.tick().await;
        let selected = select_active(&snapshots);
        self.update_active(selected);

        let Some(index) = selected else {
            debug!("No functional RPC endpoint");
            return TickOutcome::NoHealthyEndpoint;
        };
        let (Some(client), Some(config)) = (self.monitor.client(index), self.monitor.config(index)) else {
            return TickOutcome::NoHealthyEndpoint;
        };
        let endpoint = config.name.clone();

        let report = self.engine.attempt(client.as_ref(), self.max_retries).await;
        match report.outcome {
            SubmissionOutcome::Confirmed(tx_hash) => {
                self.confirmed = Some(tx_hash);
                info!(endpoint = %endpoint, tx_hash = ?tx_hash, attempts = report.attempts.len(), "Snipe successful");
                TickOutcome::Confirmed { endpoint, tx_hash }
            }
            SubmissionOutcome::Exhausted => {
                warn!(endpoint = %endpoint, sends = report.sends(), "Submission exhausted, monitoring RPC");
                TickOutcome::Exhausted { endpoint }
            }
        }
    }

    /// Chạy tới khi thành công hoặc `shutdown` hoàn thành. Tín hiệu dừng chỉ được
    /// xét giữa hai chu kỳ, không cắt ngang một lần gửi.
    pub async fn run<F>(&mut self, shutdown: F) -> RunOutcome
    where
        F: Future<Output = ()>,
    {
        self.events
            .emit(SnipeEvent::Started {
                endpoints: self.monitor.len(),
            })
            .await;

        tokio::pin!(shutdown);
        loop {
            if let TickOutcome::Confirmed { endpoint, tx_hash } = self.tick_once().await {
                return RunOutcome::Confirmed { endpoint, tx_hash };
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping monitor");
                    return RunOutcome::Shutdown;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    fn update_active(&mut self, selected: Option<usize>) {
        if selected == self.active {
            return;
        }
        match selected.and_then(|index| self.monitor.config(index)) {
            Some(config) => info!(endpoint = %config.name, url = %config.url, "🟢 Using endpoint for transactions"),
            None => warn!("No functional RPC endpoint available"),
        }
        self.active = selected;
    }
}
