pub mod client;
pub mod error;
pub mod gateway;
pub mod nats;
pub mod types;

pub use client::{BrokerClient, Delivery, Disposition, PullSubscription};
pub use error::{BrokerError, GatewayError, GatewayResult};
pub use gateway::BrokerGateway;
pub use types::*;
