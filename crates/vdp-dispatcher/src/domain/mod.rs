//! Domain layer: services, operations, resolution, faults, and deferred
//! results. No I/O.

pub mod classification;
pub mod deferred;
pub mod errors;
pub mod fault;
pub mod operation;
pub mod registry;
pub mod resolution;
pub mod signature;

pub use classification::{CategoryPolicy, ClassificationPolicy, FailureClass};
pub use deferred::{Completer, Completion, Deferred, ABANDONED};
pub use errors::DispatchError;
pub use fault::{ServiceFault, ADMIN_PROCESSING, PROCESSING};
pub use operation::{
    Arguments, CallContext, Operation, OperationTable, RemoteService, Reply, ReturnKind,
};
pub use registry::{RegistryError, ServiceDescriptor, ServiceRegistry, ServiceRegistryBuilder};
pub use resolution::{OperationResolver, ResolutionError};
pub use signature::{ParamType, Signature};
