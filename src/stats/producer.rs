//! Statistics Producer: one long-lived task sampling broker state once per tick.
//!
//! Output is an mpsc channel of capacity 1 with a single consumer. A closed
//! channel means no further snapshots will arrive; that happens when the
//! gateway is inactive, on cancellation, or when the consumer goes away.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broker::{BrokerGateway, GatewayError};
use crate::config::{BrokerConfig, StatsConfig, StatsSource};
use crate::stats::monitor::MonitorClient;
use crate::stats::snapshot::{unix_now, StatisticSnapshot};

pub enum SnapshotSource {
    Streams,
    Monitor(MonitorClient),
}

enum Sample {
    Snapshot(StatisticSnapshot),
    Skip,
    Stop,
}

pub struct StatisticsProducer {
    gateway: Arc<BrokerGateway>,
    source: SnapshotSource,
    interval: Duration,
}

impl StatisticsProducer {
    pub fn new(gateway: Arc<BrokerGateway>, interval: Duration) -> Self {
        Self {
            gateway,
            source: SnapshotSource::Streams,
            interval,
        }
    }

    pub fn from_config(gateway: Arc<BrokerGateway>, stats: &StatsConfig, broker: &BrokerConfig) -> Self {
        let producer = Self::new(gateway, stats.interval());
        match stats.source {
            StatsSource::Streams => producer,
            StatsSource::Monitor => match MonitorClient::new(&broker.monitor_url) {
                Ok(monitor) => producer.with_source(SnapshotSource::Monitor(monitor)),
                Err(e) => {
                    warn!(error = %e, "monitor source unavailable, sampling streams instead");
                    producer
                }
            },
        }
    }

    pub fn with_source(mut self, source: SnapshotSource) -> Self {
        self.source = source;
        self
    }

    /// Spawns the sampling loop and returns its output.
    /// With an inactive gateway nothing is spawned and the output is already closed.
    pub fn start(self, cancel: CancellationToken) -> mpsc::Receiver<StatisticSnapshot> {
        let (tx, rx) = mpsc::channel(1);

        if !self.gateway.is_active() {
            warn!("broker connection inactive, statistics feed disabled");
            return rx;
        }

        tokio::spawn(self.run(tx, cancel));
        rx
    }

    async fn run(self, tx: mpsc::Sender<StatisticSnapshot>, cancel: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "statistics producer started");

        loop {
            let sample = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sample = self.sample() => sample,
            };

            match sample {
                Sample::Snapshot(snapshot) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        sent = tx.send(snapshot) => {
                            if sent.is_err() {
                                debug!("statistics consumer gone");
                                break;
                            }
                        }
                    }
                }
                Sample::Skip => {}
                Sample::Stop => break,
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("statistics producer stopped");
    }

    async fn sample(&self) -> Sample {
        match &self.source {
            SnapshotSource::Streams => match self.gateway.active_streams().await {
                Ok(streams) => Sample::Snapshot(StatisticSnapshot::from_streams(&streams, unix_now())),
                Err(GatewayError::Connectivity) => Sample::Stop,
                Err(e) => {
                    warn!(error = %e, "sampling streams failed");
                    Sample::Skip
                }
            },
            SnapshotSource::Monitor(monitor) => match monitor.sample().await {
                Ok(snapshot) => Sample::Snapshot(snapshot),
                Err(e) => {
                    warn!(url = monitor.url(), error = %e, "getting monitor statistics failed");
                    Sample::Skip
                }
            },
        }
    }
}
