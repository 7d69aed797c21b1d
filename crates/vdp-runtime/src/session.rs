//! # Loopback Session
//!
//! A client session whose connection is an in-process channel. Requests go
//! through the real envelope path: encode, optionally seal, dispatch on the
//! worker pool, then decode the response off the channel.

use shared_crypto::CryptoContext;
use shared_types::{CorrelationKey, InvocationDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;
use vdp_dispatcher::{DispatchApi, DispatchError, DispatchService, OutboundEnvelope, Response, SessionClient};

/// Client-side session failures.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Request could not be encoded or response could not be decoded.
    #[error(transparent)]
    Codec(#[from] DispatchError),

    /// The connection closed before the response arrived.
    #[error("connection closed while waiting for {0}")]
    Closed(CorrelationKey),
}

/// One loopback client session.
pub struct LoopbackSession {
    service: DispatchService,
    client: SessionClient,
    responses: UnboundedReceiver<OutboundEnvelope>,
    early: HashMap<CorrelationKey, Response>,
}

impl LoopbackSession {
    pub(crate) fn new(
        service: DispatchService,
        crypto: Arc<dyn CryptoContext>,
        responses: UnboundedReceiver<OutboundEnvelope>,
    ) -> Self {
        Self {
            service,
            client: SessionClient::new(crypto),
            responses,
            early: HashMap::new(),
        }
    }

    /// Session id of the underlying connection.
    pub fn session_id(&self) -> &str {
        self.service.dispatcher().connection().session_id()
    }

    /// The server side of the session.
    pub fn service(&self) -> &DispatchService {
        &self.service
    }

    /// The client codec.
    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    /// Send a request without waiting for its response.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be encoded or sealed.
    pub fn send(
        &self,
        descriptor: InvocationDescriptor,
        seal: bool,
    ) -> Result<CorrelationKey, SessionError> {
        let (bytes, key) = self.client.encode_request(descriptor, seal)?;
        self.send_raw(bytes, key);
        Ok(key)
    }

    /// Hand raw envelope bytes to the dispatcher.
    pub fn send_raw(&self, bytes: Vec<u8>, key: CorrelationKey) {
        debug!(session_id = self.session_id(), correlation_key = %key, "Request sent");
        self.service.dispatch(bytes, key);
    }

    /// Next response in arrival order.
    ///
    /// # Errors
    ///
    /// Fails if the connection closes or the response cannot be decoded.
    pub async fn recv(&mut self) -> Result<Option<Response>, SessionError> {
        if let Some(key) = self.early.keys().next().copied() {
            return Ok(self.early.remove(&key));
        }
        match self.responses.recv().await {
            Some(out) => Ok(Some(
                self.client.decode_response(&out.bytes, out.correlation_key)?,
            )),
            None => Ok(None),
        }
    }

    /// Wait for the response to `key`, holding back others that arrive first.
    ///
    /// # Errors
    ///
    /// Fails if the connection closes or a response cannot be decoded.
    pub async fn wait_for(&mut self, key: CorrelationKey) -> Result<Response, SessionError> {
        if let Some(response) = self.early.remove(&key) {
            return Ok(response);
        }
        while let Some(out) = self.responses.recv().await {
            let response = self.client.decode_response(&out.bytes, out.correlation_key)?;
            if response.correlation_key == key {
                return Ok(response);
            }
            self.early.insert(response.correlation_key, response);
        }
        Err(SessionError::Closed(key))
    }

    /// Send a request and wait for its response.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send) and [`wait_for`](Self::wait_for).
    pub async fn call(
        &mut self,
        descriptor: InvocationDescriptor,
        seal: bool,
    ) -> Result<Response, SessionError> {
        let key = self.send(descriptor, seal)?;
        self.wait_for(key).await
    }

    /// Responses already received but not yet claimed.
    pub fn buffered(&self) -> usize {
        self.early.len()
    }
}
