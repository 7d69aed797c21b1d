//! # Service Registry
//!
//! Process-wide map from service id to service descriptor. Built once at
//! startup with [`ServiceRegistry::builder`], then shared immutably behind an
//! `Arc`; lookups take no locks.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::operation::{OperationTable, RemoteService};
use super::resolution::OperationResolver;

/// Registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A service id was registered twice.
    #[error("service '{0}' is already registered")]
    Duplicate(String),

    /// Service ids must be non-empty.
    #[error("service id must not be empty")]
    EmptyServiceId,

    /// Two operations of one service share name and signature.
    #[error("service '{service}' declares {operation} twice")]
    DuplicateOperation {
        /// Service id
        service: String,
        /// Operation with its signature
        operation: String,
    },
}

/// A registered service.
pub struct ServiceDescriptor {
    service_id: String,
    logging_context: String,
    type_name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
    resolver: OperationResolver,
}

impl ServiceDescriptor {
    /// Registered id.
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Logging context tag applied to every log line of this service's calls.
    pub fn logging_context(&self) -> &str {
        &self.logging_context
    }

    /// Rust type name of the instance.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Overload table of the service.
    pub fn resolver(&self) -> &OperationResolver {
        &self.resolver
    }

    /// The registered instance, if it is an `S`.
    pub fn instance<S: Send + Sync + 'static>(&self) -> Option<Arc<S>> {
        Arc::clone(&self.instance).downcast::<S>().ok()
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("service_id", &self.service_id)
            .field("logging_context", &self.logging_context)
            .field("type_name", &self.type_name)
            .field("operations", &self.resolver.len())
            .finish()
    }
}

/// Immutable service lookup table.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<ServiceDescriptor>>,
}

impl ServiceRegistry {
    /// Start building a registry.
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::default()
    }

    /// Look up a service by id.
    pub fn resolve(&self, service_id: &str) -> Option<Arc<ServiceDescriptor>> {
        self.services.get(service_id).cloned()
    }

    /// Registered ids, sorted.
    pub fn service_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.services.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Collects registrations before the registry is frozen.
#[derive(Debug, Default)]
pub struct ServiceRegistryBuilder {
    services: HashMap<String, Arc<ServiceDescriptor>>,
}

impl ServiceRegistryBuilder {
    /// Register `instance` under `service_id` with a logging context tag.
    ///
    /// # Errors
    ///
    /// Fails on an empty or already-registered id, or when the service
    /// declares the same operation signature twice.
    pub fn register<S: RemoteService>(
        mut self,
        service_id: impl Into<String>,
        instance: Arc<S>,
        logging_context: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let service_id = service_id.into();
        if service_id.is_empty() {
            return Err(RegistryError::EmptyServiceId);
        }
        if self.services.contains_key(&service_id) {
            return Err(RegistryError::Duplicate(service_id));
        }

        let mut table = OperationTable::new();
        S::operations(&mut table);
        let resolver = OperationResolver::new(&service_id, table.bind(Arc::clone(&instance)))?;

        let descriptor = ServiceDescriptor {
            service_id: service_id.clone(),
            logging_context: logging_context.into(),
            type_name: std::any::type_name::<S>(),
            instance,
            resolver,
        };

        tracing::debug!(
            service_id = %descriptor.service_id,
            context = %descriptor.logging_context,
            operations = descriptor.resolver.len(),
            "Registered service"
        );

        self.services.insert(service_id, Arc::new(descriptor));
        Ok(self)
    }

    /// Freeze into an immutable registry.
    pub fn build(self) -> ServiceRegistry {
        ServiceRegistry {
            services: self.services,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::operation::Reply;
    use crate::domain::signature::ParamType;
    use shared_types::Value;

    struct Echo;

    impl RemoteService for Echo {
        fn operations(table: &mut OperationTable<Self>) {
            table.sync("echo", &[ParamType::Any], |_, _, args| Ok(args.value(0)?.clone()));
        }
    }

    struct Broken;

    impl RemoteService for Broken {
        fn operations(table: &mut OperationTable<Self>) {
            table
                .sync("x", &[ParamType::Int], |_, _, _| Ok(Value::Null))
                .sync("x", &[ParamType::Int], |_, _, _| Ok(Value::Null));
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = ServiceRegistry::builder()
            .register("Echo", Arc::new(Echo), "ECHO")
            .unwrap()
            .build();

        assert_eq!(registry.len(), 1);
        let descriptor = registry.resolve("Echo").unwrap();
        assert_eq!(descriptor.service_id(), "Echo");
        assert_eq!(descriptor.logging_context(), "ECHO");
        assert!(descriptor.type_name().ends_with("Echo"));
        assert!(descriptor.instance::<Echo>().is_some());
        assert!(descriptor.instance::<Broken>().is_none());
        assert!(registry.resolve("Ghost").is_none());
    }

    #[test]
    fn test_registered_operations_are_callable() {
        let registry = ServiceRegistry::builder()
            .register("Echo", Arc::new(Echo), "ECHO")
            .unwrap()
            .build();
        let descriptor = registry.resolve("Echo").unwrap();
        let op = descriptor.resolver().resolve("echo", &[Value::Int(7)]).unwrap();
        let ctx = crate::domain::operation::CallContext {
            session_id: "s".into(),
            logging_context: "ECHO".into(),
            correlation_key: shared_types::CorrelationKey::new(),
        };
        assert!(matches!(op.invoke(&ctx, &[Value::Int(7)]), Ok(Reply::Value(Value::Int(7)))));
    }

    #[test]
    fn test_duplicate_service_rejected() {
        let err = ServiceRegistry::builder()
            .register("Echo", Arc::new(Echo), "ECHO")
            .unwrap()
            .register("Echo", Arc::new(Echo), "ECHO2")
            .unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("Echo".to_string()));
    }

    #[test]
    fn test_empty_id_rejected() {
        let err = ServiceRegistry::builder()
            .register("", Arc::new(Echo), "ECHO")
            .unwrap_err();
        assert_eq!(err, RegistryError::EmptyServiceId);
    }

    #[test]
    fn test_duplicate_operation_rejected() {
        let err = ServiceRegistry::builder()
            .register("Broken", Arc::new(Broken), "BROKEN")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "service 'Broken' declares x(int) twice"
        );
    }

    #[test]
    fn test_service_ids_sorted() {
        let registry = ServiceRegistry::builder()
            .register("b", Arc::new(Echo), "B")
            .unwrap()
            .register("a", Arc::new(Echo), "A")
            .unwrap()
            .build();
        assert_eq!(registry.service_ids(), vec!["a", "b"]);
    }
}
