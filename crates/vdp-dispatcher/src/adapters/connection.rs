//! # Client Connection
//!
//! What the dispatcher needs from one established session connection: the
//! session id for logging, the crypto context for sealing, and the send
//! primitive.

use shared_crypto::CryptoContext;
use shared_types::CorrelationKey;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::ports::outbound::{ConnectionSink, SendError};

/// One client session connection.
#[derive(Clone)]
pub struct ClientConnection {
    session_id: String,
    crypto: Arc<dyn CryptoContext>,
    sink: Arc<dyn ConnectionSink>,
}

impl ClientConnection {
    /// Create a connection.
    pub fn new(
        session_id: impl Into<String>,
        crypto: Arc<dyn CryptoContext>,
        sink: Arc<dyn ConnectionSink>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            crypto,
            sink,
        }
    }

    /// Session identifier, included in system error logs.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Crypto context negotiated for this session.
    pub fn crypto(&self) -> &dyn CryptoContext {
        self.crypto.as_ref()
    }

    /// Returns false once the connection is gone.
    pub fn is_open(&self) -> bool {
        self.sink.is_open()
    }

    /// Send response bytes.
    ///
    /// # Errors
    ///
    /// Returns `SendError::Closed` if the connection is gone.
    pub fn send(&self, envelope: Vec<u8>, correlation_key: CorrelationKey) -> Result<(), SendError> {
        self.sink.send(envelope, correlation_key)
    }
}

impl fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConnection")
            .field("session_id", &self.session_id)
            .field("open", &self.is_open())
            .finish()
    }
}

/// A response queued for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEnvelope {
    /// Serialized response envelope.
    pub bytes: Vec<u8>,
    /// Key of the request this answers.
    pub correlation_key: CorrelationKey,
}

/// Sink backed by an unbounded tokio channel. The connection's writer task
/// owns the receiver; dropping it closes the sink.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutboundEnvelope>,
}

impl ChannelSink {
    /// Create a sink and the receiver the writer task drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ConnectionSink for ChannelSink {
    fn send(&self, envelope: Vec<u8>, correlation_key: CorrelationKey) -> Result<(), SendError> {
        self.tx
            .send(OutboundEnvelope {
                bytes: envelope,
                correlation_key,
            })
            .map_err(|_| SendError::Closed)
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Sink of a connection that is already gone.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosedSink;

impl ConnectionSink for ClosedSink {
    fn send(&self, _envelope: Vec<u8>, _correlation_key: CorrelationKey) -> Result<(), SendError> {
        Err(SendError::Closed)
    }

    fn is_open(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::NoCryptor;

    #[test]
    fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelSink::new();
        let conn = ClientConnection::new("s-1", Arc::new(NoCryptor), Arc::new(sink));
        let key = CorrelationKey::new();

        assert!(conn.is_open());
        conn.send(vec![0, 1], key).unwrap();
        let out = rx.try_recv().unwrap();
        assert_eq!(out.bytes, vec![0, 1]);
        assert_eq!(out.correlation_key, key);
    }

    #[test]
    fn test_channel_sink_closes_with_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        assert!(!sink.is_open());
        assert_eq!(sink.send(vec![], CorrelationKey::new()), Err(SendError::Closed));
    }

    #[test]
    fn test_closed_sink() {
        let conn = ClientConnection::new("s-2", Arc::new(NoCryptor), Arc::new(ClosedSink));
        assert!(!conn.is_open());
        assert_eq!(conn.session_id(), "s-2");
        assert!(conn.send(vec![1], CorrelationKey::new()).is_err());
    }
}
