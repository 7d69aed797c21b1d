//! Structured logging helpers.
//!
//! Every log line produced on behalf of a service carries the service's
//! logging context tag in a `context` field, so log shippers can route and
//! filter by service without parsing messages:
//! - `context`: service logging context (e.g. `FILE_SERVICE`, `TRANSPORT`)
//! - `session_id`: client session, when known
//! - `correlation_key`: request/response pairing key, when known

/// Emit an event tagged with a logging context.
#[macro_export]
macro_rules! log_event {
    (info, $context:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            context = $context,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $context:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            context = $context,
            $($($field)*,)?
            $msg
        )
    };

    (error, $context:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            context = $context,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $context:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            context = $context,
            $($($field)*,)?
            $msg
        )
    };
}

/// Emit an event for a client session with standard fields.
#[macro_export]
macro_rules! log_session_event {
    ($level:ident, $context:expr, $msg:expr, $session_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            context = $context,
            session_id = %$session_id,
            $($($field)*,)?
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_expand_without_subscriber() {
        let session = "s-1";
        crate::log_event!(info, "TRANSPORT", "connection accepted", peer = "127.0.0.1");
        crate::log_event!(debug, "TRANSPORT", "no fields");
        crate::log_session_event!(warn, "FILE_SERVICE", "slow read", session, millis = 250u64);
    }
}
