pub mod broker;
pub mod config;
pub mod dashboard;
pub mod hub;
pub mod logging;
pub mod stats;

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broker::BrokerGateway;
use crate::config::{BrokerConfig, Config, HubConfig, StatsConfig};
use crate::hub::PushHub;
use crate::stats::{run_statistics_relay, StatisticsProducer};

// ========================================
// ENGINE
// ========================================

/// Shared state of the admin surface. Cheap to clone (all fields are Arcs or small values).
#[derive(Clone)]
pub struct AdminEngine {
    pub gateway: Arc<BrokerGateway>,
    pub hub: Arc<PushHub>,
    pub hub_config: HubConfig,
    pub start_time: Instant,
}

impl AdminEngine {
    pub fn new(gateway: BrokerGateway, hub_config: HubConfig) -> Self {
        Self {
            gateway: Arc::new(gateway),
            hub: Arc::new(PushHub::new()),
            hub_config,
            start_time: Instant::now(),
        }
    }

    /// Connects the gateway once. An unreachable broker leaves the engine
    /// serving with an inactive gateway.
    pub async fn connect(config: &Config) -> Self {
        let gateway = BrokerGateway::connect(&config.broker).await;
        Self::new(gateway, config.hub.clone())
    }

    /// Starts the statistics producer and the relay feeding its snapshots to the hub.
    /// The returned handle completes once the feed has ended.
    pub fn start_statistics(
        &self,
        stats: &StatsConfig,
        broker: &BrokerConfig,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let producer = StatisticsProducer::from_config(self.gateway.clone(), stats, broker);
        let snapshots = producer.start(cancel.clone());
        tokio::spawn(run_statistics_relay(snapshots, self.hub.clone(), cancel))
    }
}
