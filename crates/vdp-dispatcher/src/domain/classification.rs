//! # Failure Classification
//!
//! Decides whether a fault raised by a service operation is a recognized
//! processing failure or a system failure. The class selects the error kind
//! returned to the caller and the log severity; a response is sent either way.

use shared_types::ErrorKind;
use std::collections::BTreeSet;

use super::fault::{ServiceFault, ADMIN_PROCESSING, PROCESSING};

/// Outcome of classifying a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Recognized business or data failure. Logged at detail and warning.
    Processing,
    /// Anything else. Logged at error with the session id.
    System,
}

impl FailureClass {
    /// Error kind reported to the caller.
    pub fn error_kind(self) -> ErrorKind {
        match self {
            FailureClass::Processing => ErrorKind::Processing,
            FailureClass::System => ErrorKind::System,
        }
    }
}

/// Pluggable classification of service faults.
pub trait ClassificationPolicy: Send + Sync {
    /// Classify a fault raised by an operation or a deferred completion.
    fn classify(&self, fault: &ServiceFault) -> FailureClass;
}

/// Classifies by the outermost fault's category.
///
/// Faults whose category is in the set are processing failures; faults with
/// another category or none are system failures.
#[derive(Debug, Clone)]
pub struct CategoryPolicy {
    categories: BTreeSet<String>,
}

impl Default for CategoryPolicy {
    fn default() -> Self {
        Self::from_categories([PROCESSING, ADMIN_PROCESSING])
    }
}

impl CategoryPolicy {
    /// Create a policy recognizing exactly the given categories.
    pub fn from_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a processing category.
    pub fn with_processing_category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    /// Returns true if `category` is treated as a processing failure.
    pub fn is_processing_category(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    /// Recognized categories, sorted.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }
}

impl ClassificationPolicy for CategoryPolicy {
    fn classify(&self, fault: &ServiceFault) -> FailureClass {
        match fault.category() {
            Some(category) if self.is_processing_category(category) => FailureClass::Processing,
            _ => FailureClass::System,
        }
    }
}
