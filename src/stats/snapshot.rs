use serde::{Deserialize, Serialize};

use crate::broker::StreamSummary;

/// One aggregate sample of broker state. Immutable once produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticSnapshot {
    /// Unix seconds.
    pub time: i64,
    pub streams: u64,
    pub consumers: u64,
    pub messages: u64,
    pub bytes: u64,
}

impl StatisticSnapshot {
    /// Sums per-stream counts. Values are reported as-is, never scaled.
    pub fn from_streams(streams: &[StreamSummary], time: i64) -> Self {
        streams.iter().fold(
            Self {
                time,
                streams: streams.len() as u64,
                ..Self::default()
            },
            |acc, s| Self {
                consumers: acc.consumers.saturating_add(s.consumers),
                messages: acc.messages.saturating_add(s.messages),
                bytes: acc.bytes.saturating_add(s.bytes),
                ..acc
            },
        )
    }
}

pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
