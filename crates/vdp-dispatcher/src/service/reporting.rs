//! # Failure Reporting
//!
//! Log output for failed calls. Classification only picks the severity; the
//! caller gets a response either way.
//!
//! | Failure | Events |
//! |---------|--------|
//! | processing fault | `DEBUG` with the full cause chain, then `WARN` with message, category, session id, correlation key and the deepest cause's origin |
//! | system fault | `ERROR` with session id, correlation key and origin |
//! | dispatch error (unseal, decode, resolution) | `ERROR` with session id and error kind |

use shared_types::CorrelationKey;
use tracing::{debug, error, warn};

use crate::domain::classification::FailureClass;
use crate::domain::errors::DispatchError;
use crate::domain::fault::ServiceFault;

/// Log target of every dispatcher event.
pub const TARGET: &str = "vdp_dispatcher::dispatch";

/// Fields attached to every failure event.
#[derive(Debug, Clone, Copy)]
pub struct LogScope<'a> {
    /// Service logging context, or the default context before resolution.
    pub context: &'a str,
    /// Client session id.
    pub session_id: &'a str,
    /// Request correlation key.
    pub correlation_key: CorrelationKey,
}

/// Log a fault raised by an operation according to its class.
pub fn report_fault(scope: LogScope<'_>, class: FailureClass, fault: &ServiceFault) {
    let origin = fault.deepest().origin();
    match class {
        FailureClass::Processing => {
            let chain: Vec<String> = fault.chain().map(ToString::to_string).collect();
            debug!(
                target: TARGET,
                context = scope.context,
                session_id = scope.session_id,
                correlation_key = %scope.correlation_key,
                fault = %fault,
                chain = ?chain,
                origin = %origin,
                "Processing failure detail"
            );
            warn!(
                target: TARGET,
                context = scope.context,
                session_id = scope.session_id,
                correlation_key = %scope.correlation_key,
                category = fault.category().unwrap_or_default(),
                origin = %origin,
                "Processing failure: {}",
                fault.message()
            );
        }
        FailureClass::System => {
            error!(
                target: TARGET,
                context = scope.context,
                session_id = scope.session_id,
                correlation_key = %scope.correlation_key,
                origin = %origin,
                error = %fault,
                "Unexpected failure invoking operation"
            );
        }
    }
}

/// Log a failure raised by the dispatcher before or around invocation.
pub fn report_dispatch_error(scope: LogScope<'_>, err: &DispatchError) {
    error!(
        target: TARGET,
        context = scope.context,
        session_id = scope.session_id,
        correlation_key = %scope.correlation_key,
        kind = err.kind().as_str(),
        error = %err,
        "Dispatch failed"
    );
}
