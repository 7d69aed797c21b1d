//! Services bundled with the runtime.

pub mod file_service;
pub mod query_service;

pub use file_service::{match_string, FileService, FILE_SERVICE};
pub use query_service::{QueryService, QUERY_SERVICE, QUERY_VALIDATION};
