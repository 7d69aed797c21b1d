//! # Responder
//!
//! Turns a result into a response envelope and hands it to the connection.
//! Shared by the synchronous path and by deferred completions.

use shared_types::{encode_message, CorrelationKey, Envelope, InvocationResult, Payload, WireMessage};
use std::sync::Arc;
use tracing::{debug, error};
use vdp_telemetry::{metric_inc, DISPATCH_ERRORS, DISPATCH_RESPONSES};

use super::reporting::{report_dispatch_error, report_fault, LogScope, TARGET};
use super::stats::DispatchStats;
use crate::adapters::connection::ClientConnection;
use crate::domain::classification::ClassificationPolicy;
use crate::domain::deferred::Completion;
use crate::domain::errors::DispatchError;
use crate::domain::fault::ServiceFault;
use crate::ports::outbound::SendError;

/// Per-request state that outlives the worker on the deferred path.
#[derive(Debug, Clone)]
pub(crate) struct PendingCall {
    pub correlation_key: CorrelationKey,
    pub encrypt: bool,
    pub context: String,
}

/// Builds and sends responses for one connection.
#[derive(Clone)]
pub(crate) struct Responder {
    pub connection: Arc<ClientConnection>,
    pub policy: Arc<dyn ClassificationPolicy>,
    pub stats: Arc<DispatchStats>,
}

impl Responder {
    fn scope<'a>(&'a self, call: &'a PendingCall) -> LogScope<'a> {
        LogScope {
            context: &call.context,
            session_id: self.connection.session_id(),
            correlation_key: call.correlation_key,
        }
    }

    /// Answer with the outcome of a deferred result.
    pub fn complete(&self, call: &PendingCall, completion: Completion) {
        match completion {
            Ok(value) => self.send(call, InvocationResult::Value(value)),
            Err(fault) => self.fail_with_fault(call, &fault),
        }
    }

    /// Classify, log, and answer with a fault raised by an operation.
    pub fn fail_with_fault(&self, call: &PendingCall, fault: &ServiceFault) {
        let class = self.policy.classify(fault);
        report_fault(self.scope(call), class, fault);
        self.send(call, InvocationResult::Error(fault.to_record(class.error_kind())));
    }

    /// Log and answer with a dispatcher error.
    pub fn fail(&self, call: &PendingCall, err: DispatchError) {
        report_dispatch_error(self.scope(call), &err);
        self.send(call, InvocationResult::Error(err.to_record()));
    }

    /// Encode, seal if required, and send. Never sends plaintext for a
    /// sealed request.
    pub fn send(&self, call: &PendingCall, result: InvocationResult) {
        if !self.connection.is_open() {
            self.discard(call, "connection gone");
            return;
        }

        let sent_kind = result.error().map(|record| record.kind);
        let (payload, sent_kind) = match self.encode(call.encrypt, result) {
            Ok(payload) => (payload, sent_kind),
            Err(err) => {
                report_dispatch_error(self.scope(call), &err);
                let record = err.to_record();
                let kind = record.kind;
                match self.encode(call.encrypt, InvocationResult::Error(record)) {
                    Ok(payload) => (payload, Some(kind)),
                    Err(err) => {
                        error!(
                            target: TARGET,
                            context = %call.context,
                            session_id = self.connection.session_id(),
                            correlation_key = %call.correlation_key,
                            error = %err,
                            "Cannot encode error response, dropping it"
                        );
                        self.discard(call, "unencodable");
                        return;
                    }
                }
            }
        };

        let (bytes, key) = Envelope::new(call.correlation_key, payload).to_bytes();
        match self.connection.send(bytes, key) {
            Ok(()) => {
                DispatchStats::bump(&self.stats.responses_sent);
                let outcome = match sent_kind {
                    Some(kind) => {
                        DispatchStats::bump(&self.stats.error_responses);
                        metric_inc!(DISPATCH_ERRORS, &[kind.as_str()]);
                        "error"
                    }
                    None => "value",
                };
                metric_inc!(DISPATCH_RESPONSES, &[outcome]);
                debug!(
                    target: TARGET,
                    context = %call.context,
                    correlation_key = %call.correlation_key,
                    sealed = call.encrypt,
                    outcome,
                    "Response sent"
                );
            }
            Err(SendError::Closed) => self.discard(call, "connection gone"),
        }
    }

    fn encode(&self, encrypt: bool, result: InvocationResult) -> Result<Payload, DispatchError> {
        let body = encode_message(&WireMessage::Result(result))?;
        if encrypt {
            self.connection
                .crypto()
                .seal(&body)
                .map(Payload::Sealed)
                .map_err(DispatchError::Encryption)
        } else {
            Ok(Payload::Plain(body))
        }
    }

    fn discard(&self, call: &PendingCall, reason: &str) {
        DispatchStats::bump(&self.stats.dropped);
        metric_inc!(DISPATCH_RESPONSES, &["dropped"]);
        debug!(
            target: TARGET,
            context = %call.context,
            session_id = self.connection.session_id(),
            correlation_key = %call.correlation_key,
            reason,
            "Response discarded"
        );
    }
}
