//! # VDP Runtime Library
//!
//! Exposes the runtime's modules for the binary and for integration tests.
//!
//! - `container/` - runtime configuration and the shared service container
//! - `services/` - bundled remote services
//! - `session` - in-process client sessions over the full envelope path

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod container;
pub mod services;
pub mod session;

pub use container::{RuntimeConfig, RuntimeError, SecurityConfig, ServiceContainer};
pub use session::{LoopbackSession, SessionError};
