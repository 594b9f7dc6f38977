//! Push Hub: registry of connected push clients and fan-out of events to them.
//!
//! The client set is the only state shared between the producer relay and the
//! per-connection sessions. It is guarded by one mutex and never exposed.
//! Sinks only enqueue (`PushSink::deliver` must not block), so the lock is
//! never held across a network write: each connection's writer task performs
//! the actual socket I/O.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::hub::protocol::{decode_inbound, PushEnvelope};

/// Opaque handle of one open push connection. Compared by identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    fn generate() -> Self {
        ClientId(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("client connection closed")]
    Closed,
    #[error("client outbound queue full")]
    Lagging,
    #[error("push envelope cannot be encoded")]
    Encode,
}

/// Outbound side of one push connection.
pub trait PushSink: Send + Sync {
    /// Hands `frame` to the connection without waiting for the network.
    fn deliver(&self, frame: String) -> Result<(), DeliveryError>;
}

/// Sink backed by the bounded queue drained by a connection's writer task.
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

impl PushSink for ChannelSink {
    fn deliver(&self, frame: String) -> Result<(), DeliveryError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Lagging,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

pub struct PushHub {
    clients: Mutex<HashMap<ClientId, Arc<dyn PushSink>>>,
}

impl PushHub {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, sink: Arc<dyn PushSink>) -> ClientId {
        let id = ClientId::generate();
        let total = {
            let mut clients = self.clients.lock();
            clients.insert(id, sink);
            clients.len()
        };
        debug!(client = %id, total, "push client registered");
        id
    }

    /// Removes `id`. Removing an absent handle is a no-op.
    pub fn deregister(&self, id: ClientId) {
        let removed = self.clients.lock().remove(&id).is_some();
        if removed {
            debug!(client = %id, "push client deregistered");
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Delivers `envelope` to every registered client and returns how many
    /// accepted it. A client whose delivery fails is deregistered; the others
    /// are unaffected.
    pub fn broadcast_all<T: Serialize>(&self, envelope: &PushEnvelope<T>) -> usize {
        let frame = match envelope.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!(kind = %envelope.kind, error = %e, "cannot encode push envelope");
                return 0;
            }
        };

        let mut delivered = 0;
        self.clients.lock().retain(|id, sink| match sink.deliver(frame.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(e) => {
                warn!(client = %id, error = %e, "sending message to push client failed, dropping client");
                false
            }
        });
        delivered
    }

    /// Delivers `envelope` to a single client, deregistering it on a delivery
    /// failure. An envelope that cannot be encoded leaves the client registered.
    pub fn send<T: Serialize>(&self, id: ClientId, envelope: &PushEnvelope<T>) -> Result<(), DeliveryError> {
        let frame = envelope.to_frame().map_err(|e| {
            error!(client = %id, kind = %envelope.kind, error = %e, "cannot encode push envelope");
            DeliveryError::Encode
        })?;

        let mut clients = self.clients.lock();
        let result = match clients.get(&id) {
            Some(sink) => sink.deliver(frame),
            None => return Err(DeliveryError::Closed),
        };
        if let Err(e) = result {
            warn!(client = %id, error = %e, "sending message to push client failed, dropping client");
            clients.remove(&id);
        }
        result
    }

    /// Handles one client-sent frame. Malformed frames are logged and dropped;
    /// the connection stays open. Valid envelopes are echoed to the sender.
    pub fn handle_inbound(&self, id: ClientId, raw: &[u8]) {
        let envelope = match decode_inbound(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(client = %id, msg = %String::from_utf8_lossy(raw), error = %e, "cannot unmarshal message");
                return;
            }
        };

        debug!(client = %id, kind = %envelope.kind, "push frame received");
        if let Err(e) = self.send(id, &envelope) {
            debug!(client = %id, error = %e, "push reply not delivered");
        }
    }
}

impl Default for PushHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration guard: the client is deregistered when this is dropped,
/// however the owning session ends.
pub struct Registration {
    id: ClientId,
    hub: Arc<PushHub>,
}

impl Registration {
    pub fn new(hub: Arc<PushHub>, sink: Arc<dyn PushSink>) -> Self {
        let id = hub.register(sink);
        Self { id, hub }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.hub.deregister(self.id);
    }
}
