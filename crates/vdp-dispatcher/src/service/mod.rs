//! Application service layer: the dispatcher state machine, response
//! building, failure reporting, and deferred completion handling.

pub mod completion;
pub mod dispatch_service;
pub mod dispatcher;
pub mod reporting;
mod responder;
pub mod stats;

pub use completion::{CompletionHandle, CompletionRegistrar, CompletionState};
pub use dispatch_service::DispatchService;
pub use dispatcher::{Dispatcher, DEFAULT_LOG_CONTEXT};
pub use reporting::{LogScope, TARGET};
pub use stats::{DispatchStats, DispatchStatsSnapshot};
