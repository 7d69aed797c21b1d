//! # Remote Operations
//!
//! How a service exposes callable operations. A service type implements
//! [`RemoteService`] and lists its operations in an [`OperationTable`]; at
//! registration the table is bound to the instance, producing type-erased
//! [`Operation`]s the resolver can pick from.
//!
//! ```rust,ignore
//! impl RemoteService for FileService {
//!     fn operations(table: &mut OperationTable<Self>) {
//!         table.sync("remove", &[ParamType::String], |svc, _ctx, args| {
//!             Ok(Value::Bool(svc.remove(args.str(0)?)))
//!         });
//!     }
//! }
//! ```

use shared_types::{CorrelationKey, Value};
use std::fmt;
use std::sync::Arc;

use super::deferred::Deferred;
use super::fault::ServiceFault;
use super::signature::{ParamType, Signature};

/// Per-call context passed explicitly to every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Client session the call arrived on.
    pub session_id: String,
    /// Logging context tag of the target service.
    pub logging_context: String,
    /// Correlation key of the request.
    pub correlation_key: CorrelationKey,
}

/// What an operation produced.
#[derive(Debug)]
pub enum Reply {
    /// Synchronous result.
    Value(Value),
    /// Result available later. `None` is answered with a null value.
    Deferred(Option<Deferred>),
}

/// Declared return shape of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// Returns a value directly.
    Value,
    /// Returns a deferred result.
    Deferred,
}

/// Typed access to call arguments.
///
/// Resolution has already checked assignability, so a type mismatch here
/// means the operation read a different index than it declared and is
/// reported as a system fault.
#[derive(Debug, Clone, Copy)]
pub struct Arguments<'a> {
    values: &'a [Value],
}

impl<'a> Arguments<'a> {
    /// Wrap an argument slice.
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw argument at `index`.
    #[track_caller]
    pub fn value(&self, index: usize) -> Result<&'a Value, ServiceFault> {
        self.values.get(index).ok_or_else(|| {
            ServiceFault::system(format!(
                "argument {index} out of range ({} supplied)",
                self.values.len()
            ))
        })
    }

    #[track_caller]
    fn typed<T>(
        &self,
        index: usize,
        expected: &str,
        get: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, ServiceFault> {
        let value = self.value(index)?;
        get(value).ok_or_else(|| {
            ServiceFault::system(format!(
                "argument {index}: expected {expected}, got {}",
                value.value_type()
            ))
        })
    }

    /// String argument.
    #[track_caller]
    pub fn str(&self, index: usize) -> Result<&'a str, ServiceFault> {
        self.typed(index, "string", Value::as_str)
    }

    /// Nullable string argument.
    #[track_caller]
    pub fn opt_str(&self, index: usize) -> Result<Option<&'a str>, ServiceFault> {
        self.typed(index, "string or null", |v| match v {
            Value::Null => Some(None),
            other => other.as_str().map(Some),
        })
    }

    /// Byte array argument.
    #[track_caller]
    pub fn bytes(&self, index: usize) -> Result<&'a [u8], ServiceFault> {
        self.typed(index, "bytes", Value::as_bytes)
    }

    /// Boolean argument.
    #[track_caller]
    pub fn bool(&self, index: usize) -> Result<bool, ServiceFault> {
        self.typed(index, "bool", Value::as_bool)
    }

    /// Integer argument.
    #[track_caller]
    pub fn int(&self, index: usize) -> Result<i32, ServiceFault> {
        self.typed(index, "int", Value::as_int)
    }

    /// Long argument, widening from int.
    #[track_caller]
    pub fn long(&self, index: usize) -> Result<i64, ServiceFault> {
        self.typed(index, "long", Value::as_long)
    }

    /// Double argument, widening from int and long.
    #[track_caller]
    pub fn double(&self, index: usize) -> Result<f64, ServiceFault> {
        self.typed(index, "double", Value::as_double)
    }

    /// List argument.
    #[track_caller]
    pub fn list(&self, index: usize) -> Result<&'a [Value], ServiceFault> {
        self.typed(index, "list", Value::as_list)
    }
}

type Handler = Arc<dyn Fn(&CallContext, &Arguments<'_>) -> Result<Reply, ServiceFault> + Send + Sync>;

/// A callable operation bound to a service instance.
#[derive(Clone)]
pub struct Operation {
    name: String,
    signature: Signature,
    returns: ReturnKind,
    handler: Handler,
}

impl Operation {
    /// Create an operation from a bound handler.
    pub fn new<F>(name: impl Into<String>, signature: Signature, returns: ReturnKind, handler: F) -> Self
    where
        F: Fn(&CallContext, &Arguments<'_>) -> Result<Reply, ServiceFault> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            returns,
            handler: Arc::new(handler),
        }
    }

    /// Operation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Declared return shape.
    pub fn returns(&self) -> ReturnKind {
        self.returns
    }

    /// Invoke with already-resolved arguments.
    pub fn invoke(&self, ctx: &CallContext, args: &[Value]) -> Result<Reply, ServiceFault> {
        (self.handler)(ctx, &Arguments::new(args))
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .field("returns", &self.returns)
            .finish()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.signature)
    }
}

type Method<S> =
    Box<dyn Fn(&S, &CallContext, &Arguments<'_>) -> Result<Reply, ServiceFault> + Send + Sync>;

struct Entry<S> {
    name: String,
    signature: Signature,
    returns: ReturnKind,
    method: Method<S>,
}

/// Operations declared by a service type, not yet bound to an instance.
pub struct OperationTable<S> {
    entries: Vec<Entry<S>>,
}

impl<S: Send + Sync + 'static> OperationTable<S> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Declare an operation answered synchronously.
    pub fn sync<F>(&mut self, name: &str, params: &[ParamType], method: F) -> &mut Self
    where
        F: Fn(&S, &CallContext, &Arguments<'_>) -> Result<Value, ServiceFault>
            + Send
            + Sync
            + 'static,
    {
        self.entries.push(Entry {
            name: name.to_string(),
            signature: Signature::new(params),
            returns: ReturnKind::Value,
            method: Box::new(move |svc, ctx, args| method(svc, ctx, args).map(Reply::Value)),
        });
        self
    }

    /// Declare an operation answered through a deferred result.
    pub fn deferred<F>(&mut self, name: &str, params: &[ParamType], method: F) -> &mut Self
    where
        F: Fn(&S, &CallContext, &Arguments<'_>) -> Result<Option<Deferred>, ServiceFault>
            + Send
            + Sync
            + 'static,
    {
        self.entries.push(Entry {
            name: name.to_string(),
            signature: Signature::new(params),
            returns: ReturnKind::Deferred,
            method: Box::new(move |svc, ctx, args| method(svc, ctx, args).map(Reply::Deferred)),
        });
        self
    }

    /// Number of declared operations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bind every declared operation to `instance`.
    pub fn bind(self, instance: Arc<S>) -> Vec<Operation> {
        self.entries
            .into_iter()
            .map(|entry| {
                let svc = Arc::clone(&instance);
                let method = entry.method;
                Operation::new(entry.name, entry.signature, entry.returns, move |ctx, args| {
                    method(&svc, ctx, args)
                })
            })
            .collect()
    }
}

impl<S: Send + Sync + 'static> Default for OperationTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// A service type callable through the dispatcher.
pub trait RemoteService: Send + Sync + 'static {
    /// Declare the operations of this service type.
    fn operations(table: &mut OperationTable<Self>)
    where
        Self: Sized;
}
