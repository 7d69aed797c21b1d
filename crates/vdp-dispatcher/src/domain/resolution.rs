//! # Operation Resolution
//!
//! Picks the single best overload for an operation name and an argument list.
//!
//! The table is built once at registration: name → arity → candidates in
//! declaration order. Resolution only considers candidates of the exact
//! arity, scores each with [`Signature::match_cost`], and takes the unique
//! minimum. No candidate is a `NoMatch`; several at the minimum is
//! `Ambiguous`. Either way nothing is invoked.

use shared_types::{Value, ValueType};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use super::operation::Operation;
use super::registry::RegistryError;

/// Resolution failures. All map to `ErrorKind::NoMatchingOperation`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The service has no operation of that name.
    #[error("no operation named '{operation}'")]
    UnknownOperation {
        /// Requested operation name
        operation: String,
    },

    /// No overload accepts the arguments.
    #[error("no overload of '{operation}' accepts ({arguments})")]
    NoMatch {
        /// Requested operation name
        operation: String,
        /// Argument types, comma-separated
        arguments: String,
    },

    /// Several overloads match equally well.
    #[error("call to '{operation}' with ({arguments}) is ambiguous between {candidates} overloads")]
    Ambiguous {
        /// Requested operation name
        operation: String,
        /// Argument types, comma-separated
        arguments: String,
        /// Number of overloads tied at the best score
        candidates: usize,
    },
}

/// Overload table of one service.
#[derive(Debug, Default)]
pub struct OperationResolver {
    table: HashMap<String, BTreeMap<usize, Vec<Operation>>>,
    count: usize,
}

impl OperationResolver {
    /// Build the table.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateOperation` when two operations share
    /// a name and an identical signature.
    pub fn new(service_id: &str, operations: Vec<Operation>) -> Result<Self, RegistryError> {
        let mut resolver = Self::default();
        for operation in operations {
            let candidates = resolver
                .table
                .entry(operation.name().to_string())
                .or_default()
                .entry(operation.signature().arity())
                .or_default();

            if candidates
                .iter()
                .any(|existing| existing.signature() == operation.signature())
            {
                return Err(RegistryError::DuplicateOperation {
                    service: service_id.to_string(),
                    operation: operation.to_string(),
                });
            }
            candidates.push(operation);
            resolver.count += 1;
        }
        Ok(resolver)
    }

    /// Resolve `name` against `args`.
    ///
    /// # Errors
    ///
    /// See [`ResolutionError`].
    pub fn resolve(&self, name: &str, args: &[Value]) -> Result<&Operation, ResolutionError> {
        let by_arity = self
            .table
            .get(name)
            .ok_or_else(|| ResolutionError::UnknownOperation {
                operation: name.to_string(),
            })?;

        let arg_types: Vec<ValueType> = args.iter().map(Value::value_type).collect();
        let no_match = || ResolutionError::NoMatch {
            operation: name.to_string(),
            arguments: describe(&arg_types),
        };

        let candidates = by_arity.get(&args.len()).ok_or_else(no_match)?;

        let mut best: Option<(u32, &Operation)> = None;
        let mut tied = 0usize;
        for candidate in candidates {
            let Some(cost) = candidate.signature().match_cost(&arg_types) else {
                continue;
            };
            match best.map(|(best_cost, _)| best_cost) {
                Some(best_cost) if cost > best_cost => {}
                Some(best_cost) if cost == best_cost => tied += 1,
                _ => {
                    best = Some((cost, candidate));
                    tied = 1;
                }
            }
        }

        match best {
            None => Err(no_match()),
            Some(_) if tied > 1 => Err(ResolutionError::Ambiguous {
                operation: name.to_string(),
                arguments: describe(&arg_types),
                candidates: tied,
            }),
            Some((_, operation)) => Ok(operation),
        }
    }

    /// Operation names, unordered.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Total number of operations, counting overloads separately.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the service exposes nothing.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

fn describe(types: &[ValueType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
