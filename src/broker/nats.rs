//! NATS JetStream adapter for the `BrokerClient` seam.
//!
//! Pull reads use an ephemeral consumer filtered on the requested subject.
//! The consumer lives for one request: it is deleted on `unsubscribe`, and the
//! broker reaps it after `CONSUMER_INACTIVE_THRESHOLD` if that delete is lost.

use std::time::Duration;

use async_nats::jetstream::{self, consumer, stream};
use async_nats::jetstream::consumer::{pull, AckPolicy, Consumer};
use async_nats::jetstream::context::{GetStreamByNameErrorKind, GetStreamError, GetStreamErrorKind};
use async_nats::jetstream::AckKind;
use async_nats::HeaderMap;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::broker::client::{BrokerClient, Delivery, Disposition, PullSubscription};
use crate::broker::error::BrokerError;
use crate::broker::types::{ConsumerSummary, Header, StreamDetail, StreamSummary};
use crate::config::BrokerConfig;

const CONSUMER_INACTIVE_THRESHOLD: Duration = Duration::from_secs(30);
const CONSUMER_DESCRIPTION: &str = "jetview request-scoped reader";
/// Extra time granted to a fetch on top of its server-side expiry.
const FETCH_GRACE: Duration = Duration::from_millis(250);

pub struct NatsClient {
    js: jetstream::Context,
    fetch_wait: Duration,
}

impl NatsClient {
    /// Connects once. There is no retry: a failed connect is reported to the caller.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let client = async_nats::ConnectOptions::new()
            .connection_timeout(config.connect_timeout())
            .connect(config.url.as_str())
            .await
            .map_err(|e| BrokerError::Request(format!("connecting to nats: {}", e)))?;

        Ok(Self {
            js: jetstream::new(client),
            fetch_wait: config.fetch_wait(),
        })
    }

    async fn get_stream(&self, name: &str) -> Result<stream::Stream, BrokerError> {
        self.js
            .get_stream(name)
            .await
            .map_err(|e| get_stream_error(name, e))
    }
}

#[async_trait]
impl BrokerClient for NatsClient {
    fn streams(&self) -> BoxStream<'_, Result<StreamSummary, BrokerError>> {
        self.js
            .streams()
            .map(|item| item.map(|info| stream_summary(&info)).map_err(request_error))
            .boxed()
    }

    fn consumers<'a>(&'a self, stream: &'a str) -> BoxStream<'a, Result<ConsumerSummary, BrokerError>> {
        futures_util::stream::once(self.get_stream(stream))
            .map(|found| match found {
                Ok(stream) => stream
                    .consumers()
                    .map(|item| item.map(|info| consumer_summary(&info)).map_err(request_error))
                    .boxed(),
                Err(err) => futures_util::stream::iter([Err(err)]).boxed(),
            })
            .flatten()
            .boxed()
    }

    async fn stream_info(&self, name: &str) -> Result<StreamDetail, BrokerError> {
        let stream = self.get_stream(name).await?;
        Ok(stream_detail(stream.cached_info()))
    }

    async fn delete_stream(&self, name: &str) -> Result<(), BrokerError> {
        self.js
            .delete_stream(name)
            .await
            .map(|_| ())
            .map_err(request_error)
    }

    async fn delete_consumer(&self, stream: &str, consumer: &str) -> Result<(), BrokerError> {
        self.get_stream(stream)
            .await?
            .delete_consumer(consumer)
            .await
            .map(|_| ())
            .map_err(request_error)
    }

    async fn pull_subscribe(&self, subject: &str) -> Result<Box<dyn PullSubscription>, BrokerError> {
        let stream_name = self
            .js
            .stream_by_subject(subject)
            .await
            .map_err(|e| match e.kind() {
                GetStreamByNameErrorKind::NotFound => {
                    BrokerError::NotFound(format!("stream for subject {}", subject))
                }
                _ => request_error(e),
            })?;

        let stream = self.get_stream(&stream_name).await?;
        let consumer: Consumer<pull::Config> = stream
            .create_consumer(pull::Config {
                filter_subject: subject.to_string(),
                ack_policy: AckPolicy::Explicit,
                inactive_threshold: CONSUMER_INACTIVE_THRESHOLD,
                description: Some(CONSUMER_DESCRIPTION.to_string()),
                ..Default::default()
            })
            .await
            .map_err(request_error)?;

        let name = consumer.cached_info().name.clone();
        debug!(stream = %stream_name, consumer = %name, subject, "pull consumer created");

        Ok(Box::new(NatsPullSubscription {
            stream,
            consumer,
            name,
            fetch_wait: self.fetch_wait,
        }))
    }

    async fn publish(&self, subject: &str, header: &Header, payload: Bytes) -> Result<(), BrokerError> {
        let ack = if header.is_empty() {
            self.js.publish(subject.to_string(), payload).await
        } else {
            self.js
                .publish_with_headers(subject.to_string(), to_header_map(header), payload)
                .await
        }
        .map_err(request_error)?;

        let subject = subject.to_string();
        tokio::spawn(async move {
            if let Err(e) = ack.await {
                warn!(subject = %subject, error = %e, "publish not acknowledged by broker");
            }
        });

        Ok(())
    }
}

// ==========================================
// PULL SUBSCRIPTION
// ==========================================

struct NatsPullSubscription {
    stream: stream::Stream,
    consumer: Consumer<pull::Config>,
    name: String,
    fetch_wait: Duration,
}

#[async_trait]
impl PullSubscription for NatsPullSubscription {
    async fn fetch_one(&mut self) -> Result<Box<dyn Delivery>, BrokerError> {
        let mut batch = self
            .consumer
            .fetch()
            .max_messages(1)
            .expires(self.fetch_wait)
            .messages()
            .await
            .map_err(request_error)?;

        match tokio::time::timeout(self.fetch_wait + FETCH_GRACE, batch.next()).await {
            Ok(Some(Ok(message))) => Ok(Box::new(NatsDelivery { message })),
            Ok(Some(Err(e))) => Err(request_error(e)),
            Ok(None) => Err(BrokerError::NoMessages),
            Err(_) => Err(BrokerError::Timeout(self.fetch_wait.as_millis() as u64)),
        }
    }

    async fn unsubscribe(self: Box<Self>) -> Result<(), BrokerError> {
        self.stream
            .delete_consumer(&self.name)
            .await
            .map(|_| ())
            .map_err(request_error)
    }
}

struct NatsDelivery {
    message: jetstream::Message,
}

#[async_trait]
impl Delivery for NatsDelivery {
    fn subject(&self) -> &str {
        &self.message.subject
    }

    fn payload(&self) -> &[u8] {
        &self.message.payload
    }

    fn header(&self) -> Header {
        let mut header = Header::new();
        if let Some(map) = self.message.headers.as_ref() {
            for (name, values) in map.iter() {
                header
                    .entry(name.to_string())
                    .or_default()
                    .extend(values.iter().map(|v| v.as_str().to_string()));
            }
        }
        header
    }

    async fn settle(self: Box<Self>, disposition: Disposition) -> Result<(), BrokerError> {
        let result = match disposition {
            Disposition::Ack => self.message.ack().await,
            Disposition::Nak => self.message.ack_with(AckKind::Nak(None)).await,
        };
        result.map_err(|e| BrokerError::Request(e.to_string()))
    }
}

// ==========================================
// CONVERSIONS
// ==========================================

fn request_error(err: impl std::fmt::Display) -> BrokerError {
    BrokerError::Request(err.to_string())
}

fn get_stream_error(name: &str, err: GetStreamError) -> BrokerError {
    match err.kind() {
        GetStreamErrorKind::JetStream(js) if js.error_code() == jetstream::ErrorCode::STREAM_NOT_FOUND => {
            BrokerError::NotFound(format!("stream {}", name))
        }
        _ => request_error(err),
    }
}

fn stream_summary(info: &stream::Info) -> StreamSummary {
    StreamSummary {
        name: info.config.name.clone(),
        messages: info.state.messages,
        bytes: info.state.bytes,
        consumers: info.state.consumer_count as u64,
        subjects: info.state.subjects_count,
    }
}

fn stream_detail(info: &stream::Info) -> StreamDetail {
    StreamDetail {
        summary: stream_summary(info),
        description: info.config.description.clone(),
        subject_filters: info.config.subjects.clone(),
        storage: format!("{:?}", info.config.storage).to_lowercase(),
        replicas: info.config.num_replicas,
        max_messages: info.config.max_messages,
        max_bytes: info.config.max_bytes,
        max_age_secs: info.config.max_age.as_secs(),
        first_seq: info.state.first_sequence,
        last_seq: info.state.last_sequence,
    }
}

fn consumer_summary(info: &consumer::Info) -> ConsumerSummary {
    ConsumerSummary {
        name: info.name.clone(),
        stream: info.stream_name.clone(),
        durable: info.config.durable_name.is_some(),
        pending: info.num_pending,
        ack_pending: info.num_ack_pending as u64,
        redelivered: info.num_redelivered as u64,
        waiting: info.num_waiting as u64,
        delivered_stream_seq: info.delivered.stream_sequence,
        ack_floor_stream_seq: info.ack_floor.stream_sequence,
    }
}

fn to_header_map(header: &Header) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, values) in header {
        for value in values {
            map.append(name.as_str(), value.as_str());
        }
    }
    map
}
