//! Push channel envelope: `{"type": string, "message": any}` in both directions.
//!
//! Hub -> client frames currently carry only `statistic`. Other `type` values
//! sent by clients are accepted and left to future commands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::stats::StatisticSnapshot;

pub const MESSAGE_TYPE_STATISTIC: &str = "statistic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEnvelope<T = Value> {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: T,
}

impl PushEnvelope<StatisticSnapshot> {
    pub fn statistic(snapshot: StatisticSnapshot) -> Self {
        Self {
            kind: MESSAGE_TYPE_STATISTIC.to_string(),
            message: snapshot,
        }
    }
}

impl<T: Serialize> PushEnvelope<T> {
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Decodes a client-sent frame.
pub fn decode_inbound(raw: &[u8]) -> Result<PushEnvelope, serde_json::Error> {
    serde_json::from_slice(raw)
}
