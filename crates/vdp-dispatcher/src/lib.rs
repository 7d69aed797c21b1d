//! VDP Dispatcher - remote invocation of registered services.
//!
//! Receives request envelopes from a client connection, unseals them,
//! resolves the target service operation by name and argument types, invokes
//! it, and answers with exactly one response envelope.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         VDP DISPATCHER                               │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  connection ──envelope──→ DispatchService (DispatchApi)              │
//! │                                │                                     │
//! │                          WorkerPool (bounded)                        │
//! │                                │                                     │
//! │                           Dispatcher                                 │
//! │        unseal → decode → ServiceRegistry → OperationResolver         │
//! │                                │                                     │
//! │                 ┌──────────────┴──────────────┐                      │
//! │             sync reply                   Deferred result             │
//! │                 │                  CompletionRegistrar (once)        │
//! │                 └──────────────┬──────────────┘                      │
//! │                            Responder                                 │
//! │          classify → log → encode → seal if request was sealed        │
//! │                                │                                     │
//! │                     ClientConnection (ConnectionSink)                │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Failure classes
//!
//! - **Processing**: a fault whose outermost category is registered with the
//!   [`ClassificationPolicy`]. Logged at `WARN` with a `DEBUG` detail event.
//! - **System**: everything else, including panics inside operations. Logged
//!   at `ERROR`.
//!
//! Either way the caller receives an error record; classification only
//! decides severity.
//!
//! # Usage
//!
//! ```ignore
//! use vdp_dispatcher::{Dispatcher, DispatchService, ServiceRegistry, WorkerPool};
//!
//! let registry = ServiceRegistry::builder()
//!     .register("FileService", Arc::new(files), "FILES")?
//!     .build();
//! let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(config.policy()), connection);
//! let service = DispatchService::new(dispatcher, WorkerPool::new(config.worker_pool_size)?);
//! service.dispatch(raw_envelope, correlation_key);
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{
    ChannelSink, ClientConnection, ClosedSink, OutboundEnvelope, PoolError, Response,
    SessionClient, WorkerPool,
};
pub use config::{ConfigError, DispatcherConfig};
pub use domain::{
    Arguments, CallContext, CategoryPolicy, ClassificationPolicy, Completer, Completion,
    Deferred, DispatchError, FailureClass, Operation, OperationResolver, OperationTable,
    ParamType, RegistryError, RemoteService, Reply, ResolutionError, ReturnKind,
    ServiceDescriptor, ServiceFault, ServiceRegistry, ServiceRegistryBuilder, Signature,
    ABANDONED, ADMIN_PROCESSING, PROCESSING,
};
pub use ports::{ConnectionSink, DispatchApi, SendError};
pub use service::{
    CompletionHandle, CompletionRegistrar, CompletionState, DispatchService, DispatchStats,
    DispatchStatsSnapshot, Dispatcher, DEFAULT_LOG_CONTEXT,
};
