//! Broker Types: values exchanged between the gateway, its callers and the broker adapter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Broker-defined message metadata: header name -> values, in name order.
pub type Header = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub name: String,
    pub messages: u64,
    pub bytes: u64,
    pub consumers: u64,
    pub subjects: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamDetail {
    #[serde(flatten)]
    pub summary: StreamSummary,
    pub description: Option<String>,
    pub subject_filters: Vec<String>,
    pub storage: String,
    pub replicas: usize,
    pub max_messages: i64,
    pub max_bytes: i64,
    pub max_age_secs: u64,
    pub first_seq: u64,
    pub last_seq: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerSummary {
    pub name: String,
    pub stream: String,
    pub durable: bool,
    pub pending: u64,
    pub ack_pending: u64,
    pub redelivered: u64,
    pub waiting: u64,
    pub delivered_stream_seq: u64,
    pub ack_floor_stream_seq: u64,
}

/// One message read from or written to a stream.
/// `data` is the base64 (standard alphabet) form of the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub subject: String,
    pub data: String,
    #[serde(default)]
    pub header: Header,
}
