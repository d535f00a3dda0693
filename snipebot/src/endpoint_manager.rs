// External imports
use futures::future::join_all;
use metrics::counter;
use serde::{Deserialize, Serialize};

// Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Internal imports
use crate::chain_adapters::ChainClient;
use crate::health_monitor::{probe, HealthSnapshot};
use crate::notifier::{EventSink, SnipeEvent};

// Third party imports
use tracing::{debug, info, warn};

/// Thông tin tĩnh của một RPC endpoint, không thay đổi sau khi khởi động
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    pub chain_id: u64,
    pub name: String,
}

/// Trạng thái sức khỏe đã ghi nhận của một endpoint giữa các tick
#[derive(Debug, Clone)]
pub struct EndpointState {
    pub config: EndpointConfig,
    /// Kết quả của tick trước (mặc định false: chưa từng hoạt động)
    pub last_healthy: bool,
    /// Số tick liên tiếp endpoint không khỏe
    pub consecutive_failures: u32,
}

impl EndpointState {
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            config,
            last_healthy: false,
            consecutive_failures: 0,
        }
    }

    /// Ghi nhận kết quả probe. Chỉ trả về event khi trạng thái đổi.
    pub fn record(&mut self, snapshot: &HealthSnapshot) -> Option<SnipeEvent> {
        if snapshot.healthy {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }

        if snapshot.healthy == self.last_healthy {
            return None;
        }
        self.last_healthy = snapshot.healthy;

        if snapshot.healthy {
            Some(SnipeEvent::EndpointRecovered {
                endpoint: self.config.name.clone(),
            })
        } else {
            Some(SnipeEvent::EndpointDown {
                endpoint: self.config.name.clone(),
                reason: snapshot.error.clone(),
            })
        }
    }
}

struct MonitoredEndpoint {
    state: EndpointState,
    client: Arc<dyn ChainClient>,
}

/// Giám sát toàn bộ pool endpoint, mỗi tick probe tất cả endpoint theo thứ tự ưu tiên
pub struct PoolMonitor {
    endpoints: Vec<MonitoredEndpoint>,
    stale_threshold: Duration,
    events: Arc<dyn EventSink>,
}

impl PoolMonitor {
    pub fn new(
        pool: Vec<(EndpointConfig, Arc<dyn ChainClient>)>,
        stale_threshold: Duration,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let endpoints = pool
            .into_iter()
            .map(|(config, client)| MonitoredEndpoint {
                state: EndpointState::new(config),
                client,
            })
            .collect();

        Self {
            endpoints,
            stale_threshold,
            events,
        }
    }

    /// Probe mọi endpoint (song song), cập nhật trạng thái và gửi thông báo khi có thay đổi.
    /// Kết quả giữ đúng thứ tự cấu hình.
    pub async fn tick(&mut self) -> Vec<HealthSnapshot> {
        let stale_threshold = self.stale_threshold;
        let snapshots = join_all(
            self.endpoints
                .iter()
                .map(|endpoint| probe(endpoint.client.as_ref(), &endpoint.state.config, stale_threshold)),
        )
        .await;

        let mut transitions = Vec::new();
        for (endpoint, snapshot) in self.endpoints.iter_mut().zip(snapshots.iter()) {
            counter!(
                "snipebot_probe_total",
                1,
                "endpoint" => endpoint.state.config.name.clone(),
                "healthy" => snapshot.healthy.to_string()
            );

            if let Some(event) = endpoint.state.record(snapshot) {
                if snapshot.healthy {
                    info!(endpoint = %endpoint.state.config.name, "🟢 Endpoint is now functional");
                } else {
                    warn!(
                        endpoint = %endpoint.state.config.name,
                        error = snapshot.error.as_deref().unwrap_or("unknown"),
                        "Endpoint is no longer functional"
                    );
                }
                transitions.push(event);
            } else if !snapshot.healthy {
                debug!(
                    endpoint = %endpoint.state.config.name,
                    failures = endpoint.state.consecutive_failures,
                    "Endpoint still unhealthy"
                );
            }
        }

        for event in transitions {
            self.events.emit(event).await;
        }

        snapshots
    }

    /// Client của endpoint tại vị trí `index`
    pub fn client(&self, index: usize) -> Option<Arc<dyn ChainClient>> {
        self.endpoints.get(index).map(|endpoint| Arc::clone(&endpoint.client))
    }

    pub fn config(&self, index: usize) -> Option<&EndpointConfig> {
        self.endpoints.get(index).map(|endpoint| &endpoint.state.config)
    }

    pub fn states(&self) -> Vec<&EndpointState> {
        self.endpoints.iter().map(|endpoint| &endpoint.state).collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Endpoint được chọn: endpoint khỏe đầu tiên theo thứ tự ưu tiên
pub fn select_active(snapshots: &[HealthSnapshot]) -> Option<usize> {
    snapshots.iter().position(|snapshot| snapshot.healthy)
}
