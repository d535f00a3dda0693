// Standard library imports
use std::fmt;
use std::time::Duration;

// Internal imports
use crate::chain_adapters::ChainClient;
use crate::endpoint_manager::EndpointConfig;
use snipe_common::utils::{current_timestamp_ms, format_duration, format_duration_ms};

// Third party imports
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Ngưỡng mặc định để coi một chain là "stale"
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Lý do endpoint không khỏe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeFailure {
    /// Không gọi được RPC (kết nối, timeout...)
    Unreachable,
    /// RPC trả về block height nhưng không trả về block
    MissingBlock,
    /// Node còn sống nhưng block mới nhất quá cũ
    Stale,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Unreachable => write!(f, "unreachable"),
            ProbeFailure::MissingBlock => write!(f, "missing block"),
            ProbeFailure::Stale => write!(f, "stale"),
        }
    }
}

/// Kết quả probe một endpoint trong một tick, không lưu lại sau tick đó
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub endpoint_name: String,
    pub healthy: bool,
    /// Block height đọc được (0 nếu không đọc được)
    pub block_height: u64,
    /// Tuổi block mới nhất; None khi không lấy được block
    pub block_age_millis: Option<i64>,
    pub failure: Option<ProbeFailure>,
    pub error: Option<String>,
}

impl HealthSnapshot {
    pub fn healthy(endpoint_name: &str, block_height: u64, block_age_millis: i64) -> Self {
        Self {
            endpoint_name: endpoint_name.to_string(),
            healthy: true,
            block_height,
            block_age_millis: Some(block_age_millis),
            failure: None,
            error: None,
        }
    }

    pub fn failed(endpoint_name: &str, failure: ProbeFailure, error: impl Into<String>) -> Self {
        Self {
            endpoint_name: endpoint_name.to_string(),
            healthy: false,
            block_height: 0,
            block_age_millis: None,
            failure: Some(failure),
            error: Some(error.into()),
        }
    }

    fn at_height(mut self, block_height: u64, block_age_millis: Option<i64>) -> Self {
        self.block_height = block_height;
        self.block_age_millis = block_age_millis;
        self
    }

    pub fn is_stale(&self) -> bool {
        self.failure == Some(ProbeFailure::Stale)
    }
}

/// Kiểm tra một endpoint: lấy block height, lấy block đó, so tuổi block với ngưỡng.
/// Không bao giờ trả lỗi, mọi lỗi được gói vào snapshot.
pub async fn probe(client: &dyn ChainClient, endpoint: &EndpointConfig, stale_threshold: Duration) -> HealthSnapshot {
    probe_at(client, endpoint, stale_threshold, current_timestamp_ms).await
}

async fn probe_at(
    client: &dyn ChainClient,
    endpoint: &EndpointConfig,
    stale_threshold: Duration,
    now_ms: impl FnOnce() -> i64,
) -> HealthSnapshot {
    let name = endpoint.name.as_str();

    let block_height = match client.block_number().await {
        Ok(height) => height,
        Err(err) => {
            warn!(endpoint = name, transport = err.is_transport(), error = %err, "RPC check failed");
            return HealthSnapshot::failed(name, ProbeFailure::Unreachable, err.to_string());
        }
    };
    debug!(endpoint = name, block_height, "Block number");

    let block = match client.block(block_height).await {
        Ok(Some(block)) => block,
        Ok(None) => {
            warn!(endpoint = name, block_height, "Failed to get latest block details");
            return HealthSnapshot::failed(
                name,
                ProbeFailure::MissingBlock,
                format!("block {} not returned by endpoint", block_height),
            )
            .at_height(block_height, None);
        }
        Err(err) => {
            warn!(
                endpoint = name,
                block_height,
                transport = err.is_transport(),
                error = %err,
                "Failed to get latest block details"
            );
            return HealthSnapshot::failed(name, ProbeFailure::Unreachable, err.to_string())
                .at_height(block_height, None);
        }
    };

    let block_timestamp_ms = i64::try_from(block.timestamp)
        .unwrap_or(i64::MAX / 1000)
        .saturating_mul(1000);
    let block_age_millis = now_ms().saturating_sub(block_timestamp_ms);
    let threshold_ms = i64::try_from(stale_threshold.as_millis()).unwrap_or(i64::MAX);

    if block_age_millis > threshold_ms {
        warn!(
            endpoint = name,
            block_height,
            block_age = %format_duration_ms(block_age_millis.max(0) as u64),
            "Chain appears stale - last block too old"
        );
        return HealthSnapshot::failed(
            name,
            ProbeFailure::Stale,
            format!(
                "last block {} is {} old (threshold {})",
                block_height,
                format_duration_ms(block_age_millis.max(0) as u64),
                format_duration(stale_threshold)
            ),
        )
        .at_height(block_height, Some(block_age_millis));
    }

    debug!(endpoint = name, block_height, block_age_millis, "RPC is functional");
    HealthSnapshot::healthy(name, block_height, block_age_millis)
}
