#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use parking_lot::Mutex;

use jetview::broker::{
    BrokerClient, BrokerError, BrokerGateway, ConsumerSummary, Delivery, Disposition, Header, PullSubscription,
    StreamDetail, StreamSummary,
};
use jetview::config::BrokerConfig;
use jetview::hub::{DeliveryError, PushSink};

/// Ordered record of every call the gateway made into the mock.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn test_broker_config() -> BrokerConfig {
    BrokerConfig {
        list_wait_ms: 50,
        publish_stall_ms: 100,
        ..BrokerConfig::default()
    }
}

pub fn stream(name: &str, messages: u64, bytes: u64, consumers: u64) -> StreamSummary {
    StreamSummary {
        name: name.to_string(),
        messages,
        bytes,
        consumers,
        subjects: 1,
    }
}

// ==========================================
// MOCK BROKER
// ==========================================

#[derive(Default)]
pub struct MockBroker {
    calls: CallLog,
    published: Arc<Mutex<Vec<(String, Bytes)>>>,
    streams: Vec<StreamSummary>,
    hang_after_streams: bool,
    message: Option<(String, Vec<u8>, Header)>,
    fail_fetch: bool,
    fail_settle: bool,
    publish_delay: Option<Duration>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_streams(mut self, streams: Vec<StreamSummary>) -> Self {
        self.streams = streams;
        self
    }

    /// The stream listing yields its items and then never ends.
    pub fn hanging(mut self) -> Self {
        self.hang_after_streams = true;
        self
    }

    pub fn with_message(mut self, subject: &str, payload: &[u8], header: Header) -> Self {
        self.message = Some((subject.to_string(), payload.to_vec(), header));
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_settle(mut self) -> Self {
        self.fail_settle = true;
        self
    }

    pub fn with_publish_delay(mut self, delay: Duration) -> Self {
        self.publish_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }

    pub fn published(&self) -> Arc<Mutex<Vec<(String, Bytes)>>> {
        self.published.clone()
    }

    /// Wraps the mock in an active gateway and hands back its call log.
    pub fn into_gateway(self) -> (BrokerGateway, CallLog) {
        let calls = self.calls();
        (BrokerGateway::new(Arc::new(self), &test_broker_config()), calls)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    fn find(&self, name: &str) -> Result<&StreamSummary, BrokerError> {
        self.streams
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| BrokerError::NotFound(format!("stream {}", name)))
    }
}

#[async_trait]
impl BrokerClient for MockBroker {
    fn streams(&self) -> BoxStream<'_, Result<StreamSummary, BrokerError>> {
        self.record("streams");
        let items = stream::iter(self.streams.clone().into_iter().map(Ok));
        if self.hang_after_streams {
            items.chain(stream::pending()).boxed()
        } else {
            items.boxed()
        }
    }

    fn consumers<'a>(&'a self, name: &'a str) -> BoxStream<'a, Result<ConsumerSummary, BrokerError>> {
        self.record(format!("consumers:{}", name));
        match self.find(name) {
            Ok(found) => {
                let consumers: Vec<_> = (0..found.consumers)
                    .map(|i| {
                        Ok(ConsumerSummary {
                            name: format!("{}-c{}", name, i),
                            stream: name.to_string(),
                            ..ConsumerSummary::default()
                        })
                    })
                    .collect();
                stream::iter(consumers).boxed()
            }
            Err(e) => stream::iter([Err(e)]).boxed(),
        }
    }

    async fn stream_info(&self, name: &str) -> Result<StreamDetail, BrokerError> {
        self.record(format!("stream_info:{}", name));
        let summary = self.find(name)?.clone();
        Ok(StreamDetail {
            summary,
            storage: "file".to_string(),
            replicas: 1,
            ..StreamDetail::default()
        })
    }

    async fn delete_stream(&self, name: &str) -> Result<(), BrokerError> {
        self.record(format!("delete_stream:{}", name));
        self.find(name).map(|_| ())
    }

    async fn delete_consumer(&self, stream: &str, consumer: &str) -> Result<(), BrokerError> {
        self.record(format!("delete_consumer:{}:{}", stream, consumer));
        self.find(stream).map(|_| ())
    }

    async fn pull_subscribe(&self, subject: &str) -> Result<Box<dyn PullSubscription>, BrokerError> {
        self.record(format!("pull_subscribe:{}", subject));
        Ok(Box::new(MockSubscription {
            calls: self.calls(),
            message: self.message.clone(),
            fail_fetch: self.fail_fetch,
            fail_settle: self.fail_settle,
        }))
    }

    async fn publish(&self, subject: &str, _header: &Header, payload: Bytes) -> Result<(), BrokerError> {
        self.record(format!("publish:{}", subject));
        if let Some(delay) = self.publish_delay {
            tokio::time::sleep(delay).await;
        }
        self.published.lock().push((subject.to_string(), payload));
        Ok(())
    }
}

pub struct MockSubscription {
    calls: CallLog,
    message: Option<(String, Vec<u8>, Header)>,
    fail_fetch: bool,
    fail_settle: bool,
}

#[async_trait]
impl PullSubscription for MockSubscription {
    async fn fetch_one(&mut self) -> Result<Box<dyn Delivery>, BrokerError> {
        self.calls.lock().push("fetch".to_string());
        if self.fail_fetch {
            return Err(BrokerError::Request("fetch refused".to_string()));
        }
        match self.message.take() {
            Some((subject, payload, header)) => Ok(Box::new(MockDelivery {
                calls: self.calls.clone(),
                subject,
                payload,
                header,
                fail_settle: self.fail_settle,
            })),
            None => Err(BrokerError::NoMessages),
        }
    }

    async fn unsubscribe(self: Box<Self>) -> Result<(), BrokerError> {
        self.calls.lock().push("unsubscribe".to_string());
        Ok(())
    }
}

pub struct MockDelivery {
    calls: CallLog,
    subject: String,
    payload: Vec<u8>,
    header: Header,
    fail_settle: bool,
}

#[async_trait]
impl Delivery for MockDelivery {
    fn subject(&self) -> &str {
        &self.subject
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn header(&self) -> Header {
        self.header.clone()
    }

    async fn settle(self: Box<Self>, disposition: Disposition) -> Result<(), BrokerError> {
        self.calls.lock().push(disposition.as_str().to_string());
        if self.fail_settle {
            return Err(BrokerError::Request("settle refused".to_string()));
        }
        Ok(())
    }
}

// ==========================================
// MOCK PUSH SINK
// ==========================================

/// Push sink that keeps every frame it accepts. A failing sink rejects all frames.
#[derive(Default)]
pub struct MockSink {
    frames: Mutex<Vec<String>>,
    fail: bool,
}

impl MockSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            frames: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().clone()
    }

    pub fn json_frames(&self) -> Vec<serde_json::Value> {
        self.frames()
            .iter()
            .map(|f| serde_json::from_str(f).expect("frame is valid json"))
            .collect()
    }
}

impl PushSink for MockSink {
    fn deliver(&self, frame: String) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Closed);
        }
        self.frames.lock().push(frame);
        Ok(())
    }
}

/// Polls `check` until it holds or `within` elapses.
pub async fn wait_until(within: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
