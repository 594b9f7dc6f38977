//! Push Session: lifecycle of one WebSocket push connection.
//!
//! register -> read frames until error or close -> deregister -> release socket.
//! Every outbound frame (broadcasts and replies) goes through the connection's
//! bounded queue and its single writer task, so frames never interleave.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::hub::push_hub::{ChannelSink, PushHub, Registration};

pub async fn run_session(socket: WebSocket, hub: Arc<PushHub>, queue_capacity: usize) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(queue_capacity.max(1));

    let registration = Registration::new(hub.clone(), Arc::new(ChannelSink::new(tx)));
    let client = registration.id();

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = ws_tx.send(Message::Text(frame.into())).await {
                debug!(client = %client, error = %e, "push write failed");
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => hub.handle_inbound(client, text.as_bytes()),
            Ok(Message::Binary(data)) => hub.handle_inbound(client, &data),
            Ok(Message::Close(_)) => {
                debug!(client = %client, "push client closed connection");
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                debug!(client = %client, error = %e, "push read failed");
                break;
            }
        }
    }

    drop(registration);
    writer.abort();
}
