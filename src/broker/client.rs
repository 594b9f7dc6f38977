//! Broker Client seam: the calls the gateway needs from a concrete broker connection.
//!
//! The gateway never talks to a broker library directly. `NatsClient` is the
//! production implementation; tests substitute a recording mock.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::broker::error::BrokerError;
use crate::broker::types::{ConsumerSummary, Header, StreamDetail, StreamSummary};

/// How a fetched message leaves pull state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Remove the message from pending redelivery.
    Ack,
    /// Requeue the message for immediate redelivery.
    Nak,
}

impl Disposition {
    pub fn from_ack(ack: bool) -> Self {
        if ack {
            Disposition::Ack
        } else {
            Disposition::Nak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Ack => "ack",
            Disposition::Nak => "nak",
        }
    }
}

/// A message fetched from a pull subscription that still has to be settled.
#[async_trait]
pub trait Delivery: Send {
    fn subject(&self) -> &str;
    fn payload(&self) -> &[u8];
    fn header(&self) -> Header;

    /// Consumes the delivery: a fetched message is settled at most once.
    async fn settle(self: Box<Self>, disposition: Disposition) -> Result<(), BrokerError>;
}

/// A request-scoped pull subscription on one subject.
#[async_trait]
pub trait PullSubscription: Send {
    async fn fetch_one(&mut self) -> Result<Box<dyn Delivery>, BrokerError>;

    async fn unsubscribe(self: Box<Self>) -> Result<(), BrokerError>;
}

#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Streams known to the broker, yielded as the broker pages them in.
    fn streams(&self) -> BoxStream<'_, Result<StreamSummary, BrokerError>>;

    /// Consumers of `stream`, yielded as the broker pages them in.
    fn consumers<'a>(&'a self, stream: &'a str) -> BoxStream<'a, Result<ConsumerSummary, BrokerError>>;

    async fn stream_info(&self, name: &str) -> Result<StreamDetail, BrokerError>;

    async fn delete_stream(&self, name: &str) -> Result<(), BrokerError>;

    async fn delete_consumer(&self, stream: &str, consumer: &str) -> Result<(), BrokerError>;

    async fn pull_subscribe(&self, subject: &str) -> Result<Box<dyn PullSubscription>, BrokerError>;

    /// Enqueues a publish. Returns once the broker connection accepted the
    /// message; it may wait while the outbound queue is stalled.
    async fn publish(&self, subject: &str, header: &Header, payload: Bytes) -> Result<(), BrokerError>;
}
