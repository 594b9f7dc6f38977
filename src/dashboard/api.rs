//! Admin request handlers: validate parameters, call the gateway, wrap the result.
//!
//! Parameters are read by [`AdminForm`]. Every handler answers with the
//! uniform envelope, including on bad input.

use std::future::Future;

use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::broker::{ConsumerSummary, GatewayError, GatewayResult, Header, StreamDetail, StreamMessage, StreamSummary};
use crate::dashboard::envelope::ApiResponse;
use crate::dashboard::params::AdminForm;
use crate::hub::run_session;
use crate::AdminEngine;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub active: bool,
    pub clients: usize,
    pub uptime_seconds: u64,
}

// --- STREAMS ---

pub async fn active_streams(State(engine): State<AdminEngine>) -> ApiResponse<Vec<StreamSummary>> {
    ApiResponse::from_result(engine.gateway.active_streams().await)
}

pub async fn stream_info(State(engine): State<AdminEngine>, AdminForm(params): AdminForm) -> ApiResponse<StreamDetail> {
    respond(async move {
        let stream = required(&params.stream, "stream")?;
        engine.gateway.stream_info(stream).await
    })
    .await
}

pub async fn delete_stream(State(engine): State<AdminEngine>, AdminForm(params): AdminForm) -> ApiResponse<()> {
    respond(async move {
        let stream = required(&params.stream, "stream")?;
        engine.gateway.delete_stream(stream).await
    })
    .await
}

// --- CONSUMERS ---

pub async fn active_consumers(
    State(engine): State<AdminEngine>,
    AdminForm(params): AdminForm,
) -> ApiResponse<Vec<ConsumerSummary>> {
    respond(async move {
        let stream = required(&params.stream, "stream")?;
        engine.gateway.active_consumers(stream).await
    })
    .await
}

pub async fn delete_consumer(State(engine): State<AdminEngine>, AdminForm(params): AdminForm) -> ApiResponse<()> {
    respond(async move {
        let stream = required(&params.stream, "stream")?;
        let consumer = required(&params.consumer, "consumer")?;
        engine.gateway.delete_consumer(stream, consumer).await
    })
    .await
}

// --- MESSAGES ---

pub async fn read_message(State(engine): State<AdminEngine>, AdminForm(params): AdminForm) -> ApiResponse<StreamMessage> {
    respond(async move {
        let subject = required(&params.subject, "subject")?;
        engine.gateway.read_message(subject, parse_flag(&params.ack)).await
    })
    .await
}

pub async fn send_message(State(engine): State<AdminEngine>, AdminForm(params): AdminForm) -> ApiResponse<()> {
    respond(async move {
        let subject = required(&params.subject, "subject")?.to_string();
        engine
            .gateway
            .send_message(StreamMessage {
                subject,
                data: params.data,
                header: Header::new(),
            })
            .await
    })
    .await
}

// --- LIVE ---

pub async fn health(State(engine): State<AdminEngine>) -> Json<HealthReport> {
    Json(HealthReport {
        active: engine.gateway.is_active(),
        clients: engine.hub.client_count(),
        uptime_seconds: engine.start_time.elapsed().as_secs(),
    })
}

pub async fn push_channel(ws: WebSocketUpgrade, State(engine): State<AdminEngine>) -> impl IntoResponse {
    let queue_capacity = engine.hub_config.client_queue_capacity;
    ws.on_upgrade(move |socket| run_session(socket, engine.hub, queue_capacity))
}

// --- HELPERS ---

async fn respond<T, F>(work: F) -> ApiResponse<T>
where
    T: Serialize,
    F: Future<Output = GatewayResult<T>>,
{
    ApiResponse::from_result(work.await)
}

fn required<'a>(value: &'a str, name: &str) -> GatewayResult<&'a str> {
    if value.is_empty() {
        return Err(GatewayError::Validation(format!("{} in query not specified", name)));
    }
    Ok(value)
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
