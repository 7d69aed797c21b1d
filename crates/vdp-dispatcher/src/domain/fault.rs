//! # Service Faults
//!
//! The failure type returned by service operations. A fault carries an
//! optional category (used by the classification policy), a message, an
//! optional chained cause, and the source location where it was raised.

use shared_types::{ErrorKind, ErrorRecord};
use std::fmt;
use std::panic::Location;

/// Category of recognized business or data failures.
pub const PROCESSING: &str = "processing";

/// Category of recognized administrative failures.
pub const ADMIN_PROCESSING: &str = "admin-processing";

/// Failure raised by a service operation.
#[derive(Debug, Clone)]
pub struct ServiceFault {
    category: Option<String>,
    message: String,
    cause: Option<Box<ServiceFault>>,
    origin: &'static Location<'static>,
}

impl ServiceFault {
    /// Create a fault with an explicit category.
    #[track_caller]
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            message: message.into(),
            cause: None,
            origin: Location::caller(),
        }
    }

    /// A recognized processing failure.
    #[track_caller]
    pub fn processing(message: impl Into<String>) -> Self {
        Self::new(PROCESSING, message)
    }

    /// A recognized administrative failure.
    #[track_caller]
    pub fn admin(message: impl Into<String>) -> Self {
        Self::new(ADMIN_PROCESSING, message)
    }

    /// An uncategorized failure.
    #[track_caller]
    pub fn system(message: impl Into<String>) -> Self {
        Self {
            category: None,
            message: message.into(),
            cause: None,
            origin: Location::caller(),
        }
    }

    /// Convert a standard error, keeping its `source()` chain as causes.
    #[track_caller]
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let origin = Location::caller();
        let mut messages = Vec::new();
        let mut current = Some(error);
        while let Some(err) = current {
            messages.push(err.to_string());
            current = err.source();
        }

        messages
            .into_iter()
            .rev()
            .fold(None, |cause: Option<ServiceFault>, message| {
                Some(ServiceFault {
                    category: None,
                    message,
                    cause: cause.map(Box::new),
                    origin,
                })
            })
            .unwrap_or_else(|| ServiceFault {
                category: None,
                message: String::new(),
                cause: None,
                origin,
            })
    }

    /// Attach a chained cause.
    pub fn with_cause(mut self, cause: ServiceFault) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Reported category, if any.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Directly chained cause.
    pub fn cause(&self) -> Option<&ServiceFault> {
        self.cause.as_deref()
    }

    /// Where this fault was raised.
    pub fn origin(&self) -> &'static Location<'static> {
        self.origin
    }

    /// This fault and its causes, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &ServiceFault> {
        std::iter::successors(Some(self), |fault| fault.cause.as_deref())
    }

    /// The innermost cause.
    pub fn deepest(&self) -> &ServiceFault {
        self.chain().last().unwrap_or(self)
    }

    /// Build the caller-facing record. Causes keep their own categories.
    pub fn to_record(&self, kind: ErrorKind) -> ErrorRecord {
        let mut record = ErrorRecord::new(kind, self.message.clone());
        if let Some(category) = &self.category {
            record = record.with_category(category.clone());
        }
        if let Some(cause) = &self.cause {
            record = record.with_cause(cause.to_record(kind));
        }
        record
    }
}

impl fmt::Display for ServiceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(category) = &self.category {
            write!(f, "[{category}] ")?;
        }
        f.write_str(&self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": caused by {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceFault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_category() {
        assert_eq!(ServiceFault::processing("x").category(), Some(PROCESSING));
        assert_eq!(ServiceFault::admin("x").category(), Some(ADMIN_PROCESSING));
        assert_eq!(ServiceFault::system("x").category(), None);
        assert_eq!(
            ServiceFault::new("connector", "x").category(),
            Some("connector")
        );
    }

    #[test]
    fn test_origin_is_caller() {
        let fault = ServiceFault::processing("here");
        assert!(fault.origin().file().ends_with("fault.rs"));
        assert_eq!(fault.origin().line(), line!() - 2);
    }

    #[test]
    fn test_deepest_cause() {
        let inner = ServiceFault::system("disk full");
        let inner_line = inner.origin().line();
        let fault = ServiceFault::processing("write failed")
            .with_cause(ServiceFault::system("flush failed").with_cause(inner));

        assert_eq!(fault.chain().count(), 3);
        assert_eq!(fault.deepest().message(), "disk full");
        assert_eq!(fault.deepest().origin().line(), inner_line);
    }

    #[test]
    fn test_from_error_keeps_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such object");
        let fault = ServiceFault::from_error(&io);
        assert_eq!(fault.message(), "no such object");
        assert!(fault.category().is_none());

        let chained = ServiceFault::processing("outer").with_cause(ServiceFault::system("inner"));
        let converted = ServiceFault::from_error(&chained);
        assert_eq!(converted.chain().count(), 2);
        assert_eq!(converted.deepest().message(), "inner");
    }

    #[test]
    fn test_to_record() {
        let fault = ServiceFault::processing("bad query")
            .with_cause(ServiceFault::new("parser", "unexpected token"));
        let record = fault.to_record(ErrorKind::Processing);

        assert_eq!(record.kind, ErrorKind::Processing);
        assert_eq!(record.category.as_deref(), Some(PROCESSING));
        let cause = record.cause.as_deref().unwrap();
        assert_eq!(cause.message, "unexpected token");
        assert_eq!(cause.category.as_deref(), Some("parser"));
    }

    #[test]
    fn test_display_and_source() {
        use std::error::Error;
        let fault = ServiceFault::processing("outer").with_cause(ServiceFault::system("inner"));
        assert_eq!(fault.to_string(), "[processing] outer: caused by inner");
        assert!(fault.source().is_some());
    }
}
