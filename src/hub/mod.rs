pub mod protocol;
pub mod push_hub;
pub mod session;

pub use protocol::{decode_inbound, PushEnvelope, MESSAGE_TYPE_STATISTIC};
pub use push_hub::{ChannelSink, ClientId, DeliveryError, PushHub, PushSink, Registration};
pub use session::run_session;
