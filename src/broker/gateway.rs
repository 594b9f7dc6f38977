//! Broker Gateway: the only holder of the broker connection.
//!
//! Every operation passes the connectivity gate first. A gateway built against
//! an unreachable broker stays inactive for its whole lifetime and answers
//! every call with `GatewayError::Connectivity` without touching the network.
//! There is no reconnect: restarting the process is the recovery path.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tracing::{debug, error, info, warn};

use crate::broker::client::{BrokerClient, Delivery, Disposition};
use crate::broker::error::{BrokerError, GatewayError, GatewayResult};
use crate::broker::nats::NatsClient;
use crate::broker::types::{ConsumerSummary, StreamDetail, StreamMessage, StreamSummary};
use crate::config::BrokerConfig;

pub struct BrokerGateway {
    active: bool,
    client: Option<Arc<dyn BrokerClient>>,
    list_wait: Duration,
    publish_stall: Duration,
}

impl BrokerGateway {
    /// Connects to the configured broker. Never fails: an unreachable broker
    /// yields an inactive gateway.
    pub async fn connect(config: &BrokerConfig) -> Self {
        match NatsClient::connect(config).await {
            Ok(client) => {
                info!(url = %config.url, "connected to broker");
                Self::new(Arc::new(client), config)
            }
            Err(e) => {
                error!(url = %config.url, error = %e, "broker unreachable, gateway inactive");
                Self::inactive(config)
            }
        }
    }

    pub fn new(client: Arc<dyn BrokerClient>, config: &BrokerConfig) -> Self {
        Self::with_state(client, true, config)
    }

    pub fn inactive(config: &BrokerConfig) -> Self {
        Self {
            active: false,
            client: None,
            list_wait: config.list_wait(),
            publish_stall: config.publish_stall(),
        }
    }

    /// Builds a gateway around `client` with an explicit activity flag.
    /// An inactive gateway keeps the handle but never calls it.
    pub fn with_state(client: Arc<dyn BrokerClient>, active: bool, config: &BrokerConfig) -> Self {
        Self {
            active,
            client: Some(client),
            list_wait: config.list_wait(),
            publish_stall: config.publish_stall(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active && self.client.is_some()
    }

    fn check_active(&self) -> GatewayResult<&dyn BrokerClient> {
        match &self.client {
            Some(client) if self.active => Ok(client.as_ref()),
            _ => Err(GatewayError::Connectivity),
        }
    }

    // --- INTROSPECTION ---

    /// Lists streams, waiting at most `list_wait`. A slow broker yields a partial list.
    pub async fn active_streams(&self) -> GatewayResult<Vec<StreamSummary>> {
        let client = self.check_active()?;
        collect_bounded(client.streams(), self.list_wait, "list streams").await
    }

    pub async fn stream_info(&self, name: &str) -> GatewayResult<StreamDetail> {
        let client = self.check_active()?;
        client
            .stream_info(name)
            .await
            .map_err(|e| not_found_or(e, "stream info"))
    }

    /// Lists consumers of `stream` under the same bounded wait as `active_streams`.
    pub async fn active_consumers(&self, stream: &str) -> GatewayResult<Vec<ConsumerSummary>> {
        let client = self.check_active()?;
        collect_bounded(client.consumers(stream), self.list_wait, "list consumers").await
    }

    // --- ADMINISTRATION ---

    pub async fn delete_stream(&self, name: &str) -> GatewayResult<()> {
        let client = self.check_active()?;
        client
            .delete_stream(name)
            .await
            .map_err(|e| not_found_or(e, "delete stream"))?;
        info!(stream = name, "stream deleted");
        Ok(())
    }

    pub async fn delete_consumer(&self, stream: &str, consumer: &str) -> GatewayResult<()> {
        let client = self.check_active()?;
        client
            .delete_consumer(stream, consumer)
            .await
            .map_err(|e| not_found_or(e, "delete consumer"))?;
        info!(stream, consumer, "consumer deleted");
        Ok(())
    }

    // --- MESSAGES ---

    /// Pulls exactly one pending message from `subject`, then acks it (`ack`)
    /// or naks it (`!ack`). The subscription is released whatever the outcome.
    ///
    /// A failed ack/nak is reported as an error even though the message has
    /// already left pull state.
    pub async fn read_message(&self, subject: &str, ack: bool) -> GatewayResult<StreamMessage> {
        let client = self.check_active()?;

        let mut subscription = client
            .pull_subscribe(subject)
            .await
            .map_err(|e| not_found_or(e, "subscribe to stream"))?;

        let result = match subscription.fetch_one().await {
            Ok(delivery) => settle(delivery, Disposition::from_ack(ack)).await,
            Err(e) => Err(GatewayError::upstream("fetch message")(e)),
        };

        if let Err(e) = subscription.unsubscribe().await {
            warn!(subject, error = %e, "releasing pull subscription failed");
        }

        result
    }

    /// Decodes the base64 payload and publishes it. Waits at most
    /// `publish_stall` for the outbound queue to accept the message.
    pub async fn send_message(&self, message: StreamMessage) -> GatewayResult<()> {
        let client = self.check_active()?;

        let payload = BASE64
            .decode(message.data.as_bytes())
            .map_err(|e| GatewayError::Validation(format!("decoding base64 message: {}", e)))?;

        let publish = client.publish(&message.subject, &message.header, Bytes::from(payload));
        match tokio::time::timeout(self.publish_stall, publish).await {
            Ok(result) => result.map_err(GatewayError::upstream("publish message")),
            Err(_) => Err(GatewayError::PublishStalled(self.publish_stall.as_millis() as u64)),
        }
    }
}

async fn settle(delivery: Box<dyn Delivery>, disposition: Disposition) -> GatewayResult<StreamMessage> {
    let message = StreamMessage {
        subject: delivery.subject().to_string(),
        data: BASE64.encode(delivery.payload()),
        header: delivery.header(),
    };

    let op = match disposition {
        Disposition::Ack => "ack message",
        Disposition::Nak => "nak message",
    };
    delivery
        .settle(disposition)
        .await
        .map_err(GatewayError::upstream(op))?;

    debug!(subject = %message.subject, disposition = disposition.as_str(), "message read");
    Ok(message)
}

fn not_found_or(err: BrokerError, op: &'static str) -> GatewayError {
    match err {
        BrokerError::NotFound(what) => GatewayError::NotFound(what),
        other => GatewayError::upstream(op)(other),
    }
}

/// Drains a broker listing until it ends, fails, or `wait` elapses.
/// Only a not-found failure before the first item is an error; anything
/// else returns what was collected so far.
async fn collect_bounded<T>(
    mut items: BoxStream<'_, Result<T, BrokerError>>,
    wait: Duration,
    op: &'static str,
) -> GatewayResult<Vec<T>> {
    let mut collected = Vec::with_capacity(8);
    let deadline = tokio::time::sleep(wait);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            item = items.next() => match item {
                Some(Ok(value)) => collected.push(value),
                Some(Err(BrokerError::NotFound(what))) if collected.is_empty() => {
                    return Err(GatewayError::NotFound(what));
                }
                Some(Err(e)) => {
                    warn!(op, error = %e, collected = collected.len(), "listing interrupted");
                    break;
                }
                None => break,
            },
            _ = &mut deadline => {
                debug!(op, collected = collected.len(), "listing cut at bounded wait");
                break;
            }
        }
    }

    Ok(collected)
}
