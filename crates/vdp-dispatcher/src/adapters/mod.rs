//! Adapters: the worker pool, the client connection and its sinks, and the
//! client-side envelope codec.

pub mod client;
pub mod connection;
pub mod worker_pool;

pub use client::{Response, SessionClient};
pub use connection::{ChannelSink, ClientConnection, ClosedSink, OutboundEnvelope};
pub use worker_pool::{PoolError, WorkerPool};
