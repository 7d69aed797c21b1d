//! # Dispatcher
//!
//! Core state machine, run once per request envelope on a worker:
//!
//! ```text
//! Received ─→ Unsealed ─→ Resolved ─→ Invoking ─┬─→ Completed ─→ Responded
//!    │            │           │                  └─→ Pending ───→ Responded
//!    └────────────┴───────────┴──→ error response (no invocation)
//! ```
//!
//! The encryption flag is taken from the request's payload tag and decides
//! whether every response for that request, including error responses and
//! deferred completions, is sealed.

use shared_types::{
    decode_message, CorrelationKey, Envelope, InvocationDescriptor, InvocationResult, Payload,
    Value, WireMessage,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, debug_span};
use vdp_telemetry::{metric_inc, time_histogram, DISPATCH_DURATION, DISPATCH_REQUESTS};

use super::completion::CompletionRegistrar;
use super::reporting::TARGET;
use super::responder::{PendingCall, Responder};
use super::stats::{DispatchStats, DispatchStatsSnapshot};
use crate::adapters::connection::ClientConnection;
use crate::domain::classification::ClassificationPolicy;
use crate::domain::deferred::{panic_message, Deferred};
use crate::domain::errors::DispatchError;
use crate::domain::fault::ServiceFault;
use crate::domain::operation::{CallContext, Reply};
use crate::domain::registry::ServiceRegistry;

/// Logging context used before a service has been resolved.
pub const DEFAULT_LOG_CONTEXT: &str = "TRANSPORT";

/// Dispatches request envelopes of one client connection.
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
    responder: Responder,
    registrar: CompletionRegistrar,
    default_context: String,
}

impl Dispatcher {
    /// Create a dispatcher for `connection`.
    pub fn new(
        registry: Arc<ServiceRegistry>,
        policy: Arc<dyn ClassificationPolicy>,
        connection: Arc<ClientConnection>,
    ) -> Self {
        Self {
            registry,
            responder: Responder {
                connection,
                policy,
                stats: Arc::new(DispatchStats::default()),
            },
            registrar: CompletionRegistrar::new(),
            default_context: DEFAULT_LOG_CONTEXT.to_string(),
        }
    }

    /// Context tag for failures that happen before resolution.
    pub fn with_default_context(mut self, context: impl Into<String>) -> Self {
        self.default_context = context.into();
        self
    }

    /// Share counters with other dispatchers.
    pub fn with_stats(mut self, stats: Arc<DispatchStats>) -> Self {
        self.responder.stats = stats;
        self
    }

    /// Share a registrar with other dispatchers.
    pub fn with_registrar(mut self, registrar: CompletionRegistrar) -> Self {
        self.registrar = registrar;
        self
    }

    /// Current counters.
    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.responder.stats.snapshot()
    }

    /// Deferred completions still outstanding.
    pub fn pending_completions(&self) -> usize {
        self.registrar.pending()
    }

    /// The connection responses go to.
    pub fn connection(&self) -> &ClientConnection {
        &self.responder.connection
    }

    /// Handle one request envelope on the calling thread.
    ///
    /// Synchronous operations run to completion here. Deferred operations
    /// register a completion and return; the response is sent later from the
    /// completing thread.
    pub fn dispatch(&self, raw: &[u8], correlation_key: CorrelationKey) {
        DispatchStats::bump(&self.responder.stats.received);
        metric_inc!(DISPATCH_REQUESTS);
        let _timer = time_histogram!(DISPATCH_DURATION);

        let mut call = PendingCall {
            correlation_key,
            encrypt: false,
            context: self.default_context.clone(),
        };

        let envelope = match Envelope::from_bytes(raw, correlation_key) {
            Ok(envelope) => envelope,
            Err(e) => return self.responder.fail(&call, e.into()),
        };
        call.encrypt = envelope.is_sealed();

        let invocation = match self.open(envelope) {
            Ok(invocation) => invocation,
            Err(e) => return self.responder.fail(&call, e),
        };

        let Some(service) = self.registry.resolve(&invocation.target_service_id) else {
            let err = DispatchError::UnknownService(invocation.target_service_id);
            return self.responder.fail(&call, err);
        };
        call.context = service.logging_context().to_string();

        let operation = match service
            .resolver()
            .resolve(&invocation.operation_name, &invocation.arguments)
        {
            Ok(operation) => operation,
            Err(e) => return self.responder.fail(&call, e.into()),
        };

        let ctx = CallContext {
            session_id: self.responder.connection.session_id().to_string(),
            logging_context: call.context.clone(),
            correlation_key,
        };

        let span = debug_span!(
            target: TARGET,
            "invoke",
            context = %call.context,
            service = service.service_id(),
            operation = %operation,
            correlation_key = %correlation_key,
        );
        let _entered = span.enter();

        DispatchStats::bump(&self.responder.stats.invoked);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            operation.invoke(&ctx, &invocation.arguments)
        }))
        .unwrap_or_else(|panic| {
            Err(ServiceFault::system(format!(
                "operation panicked: {}",
                panic_message(panic.as_ref())
            )))
        });

        match outcome {
            Ok(Reply::Value(value)) => self.responder.send(&call, InvocationResult::Value(value)),
            Ok(Reply::Deferred(None)) => {
                debug!(target: TARGET, "Deferred operation returned no handle, answering null");
                self.responder.send(&call, InvocationResult::Value(Value::Null));
            }
            Ok(Reply::Deferred(Some(deferred))) => self.defer(call, deferred),
            Err(fault) => self.responder.fail_with_fault(&call, &fault),
        }
    }

    fn open(&self, envelope: Envelope) -> Result<InvocationDescriptor, DispatchError> {
        let (_, payload) = envelope.into_parts();
        let body = match payload {
            Payload::Sealed(sealed) => self
                .responder
                .connection
                .crypto()
                .unseal(&sealed)
                .map_err(DispatchError::Decryption)?,
            Payload::Plain(body) => body,
        };

        match decode_message(&body)? {
            WireMessage::Invocation(invocation) => Ok(invocation),
            WireMessage::Result(_) => Err(DispatchError::UnexpectedMessage("result")),
        }
    }

    fn defer(&self, call: PendingCall, deferred: Deferred) {
        DispatchStats::bump(&self.responder.stats.deferred);
        let responder = self.responder.clone();
        let handle = self
            .registrar
            .register(deferred, move |completion| responder.complete(&call, completion));
        debug!(target: TARGET, state = ?handle.state(), "Registered deferred completion");
    }
}
