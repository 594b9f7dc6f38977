pub mod monitor;
pub mod producer;
pub mod relay;
pub mod snapshot;

pub use monitor::{MonitorClient, MonitorError};
pub use producer::{SnapshotSource, StatisticsProducer};
pub use relay::run_statistics_relay;
pub use snapshot::StatisticSnapshot;
