use thiserror::Error;

/// Failure of a single call into the broker adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no messages available")]
    NoMessages,
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("{0}")]
    Request(String),
}

/// Errors surfaced by the gateway to its callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The broker was unreachable when the gateway was built; no call was attempted.
    #[error("connect not active")]
    Connectivity,
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{op}: {source}")]
    Upstream {
        op: &'static str,
        #[source]
        source: BrokerError,
    },
    #[error("publish message: stalled for more than {0} ms")]
    PublishStalled(u64),
}

impl GatewayError {
    pub(crate) fn upstream(op: &'static str) -> impl FnOnce(BrokerError) -> GatewayError {
        move |source| GatewayError::Upstream { op, source }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
