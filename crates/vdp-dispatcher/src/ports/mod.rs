//! Ports: the dispatcher's driving API and the connection it answers on.

pub mod inbound;
pub mod outbound;

pub use inbound::DispatchApi;
pub use outbound::{ConnectionSink, SendError};
