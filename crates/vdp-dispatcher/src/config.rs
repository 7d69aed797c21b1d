//! Dispatcher configuration with validation.

use serde::{Deserialize, Serialize};
use std::thread;
use thiserror::Error;

use crate::domain::classification::CategoryPolicy;
use crate::service::dispatcher::DEFAULT_LOG_CONTEXT;

/// Dispatcher settings shared by every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Number of concurrent dispatch workers.
    pub worker_pool_size: usize,
    /// Logging context used before a service is resolved.
    pub default_log_context: String,
    /// Categories treated as processing failures in addition to the
    /// built-in ones.
    pub processing_categories: Vec<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: default_pool_size(),
            default_log_context: DEFAULT_LOG_CONTEXT.to_string(),
            processing_categories: Vec::new(),
        }
    }
}

impl DispatcherConfig {
    /// Load configuration from environment variables.
    ///
    /// - `VDP_WORKER_POOL_SIZE`
    /// - `VDP_DEFAULT_LOG_CONTEXT`
    /// - `VDP_PROCESSING_CATEGORIES` (comma-separated)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(size) = lookup("VDP_WORKER_POOL_SIZE") {
            config.worker_pool_size = size.trim().parse().map_err(|_| {
                ConfigError::InvalidPoolSize(format!("'{size}' is not a number"))
            })?;
        }
        if let Some(context) = lookup("VDP_DEFAULT_LOG_CONTEXT") {
            config.default_log_context = context.trim().to_string();
        }
        if let Some(categories) = lookup("VDP_PROCESSING_CATEGORIES") {
            config.processing_categories = categories
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_pool_size == 0 {
            return Err(ConfigError::InvalidPoolSize(
                "worker_pool_size cannot be 0".into(),
            ));
        }
        if self.default_log_context.is_empty() {
            return Err(ConfigError::Invalid(
                "default_log_context cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Classification policy with the configured categories added.
    pub fn policy(&self) -> CategoryPolicy {
        self.processing_categories
            .iter()
            .fold(CategoryPolicy::default(), |policy, category| {
                policy.with_processing_category(category.clone())
            })
    }
}

fn default_pool_size() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(1)
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid worker pool size
    #[error("invalid worker pool size: {0}")]
    InvalidPoolSize(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = DispatcherConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.worker_pool_size >= 1);
        assert_eq!(config.default_log_context, "TRANSPORT");
    }

    #[test]
    fn test_from_lookup() {
        let config = DispatcherConfig::from_lookup(lookup(&[
            ("VDP_WORKER_POOL_SIZE", "3"),
            ("VDP_DEFAULT_LOG_CONTEXT", "GATEWAY"),
            ("VDP_PROCESSING_CATEGORIES", "connector-validation, ,quota"),
        ]))
        .unwrap();

        assert_eq!(config.worker_pool_size, 3);
        assert_eq!(config.default_log_context, "GATEWAY");
        assert_eq!(
            config.processing_categories,
            vec!["connector-validation".to_string(), "quota".to_string()]
        );
    }

    #[test]
    fn test_zero_pool_rejected() {
        let err = DispatcherConfig::from_lookup(lookup(&[("VDP_WORKER_POOL_SIZE", "0")]));
        assert!(matches!(err, Err(ConfigError::InvalidPoolSize(_))));
    }

    #[test]
    fn test_garbage_pool_size_rejected() {
        let err = DispatcherConfig::from_lookup(lookup(&[("VDP_WORKER_POOL_SIZE", "many")]));
        assert!(matches!(err, Err(ConfigError::InvalidPoolSize(_))));
    }

    #[test]
    fn test_policy_includes_configured_categories() {
        let config = DispatcherConfig {
            processing_categories: vec!["quota".into()],
            ..DispatcherConfig::default()
        };
        let policy = config.policy();
        assert!(policy.is_processing_category("quota"));
        assert!(policy.is_processing_category("processing"));
        assert!(policy.is_processing_category("admin-processing"));
        assert!(!policy.is_processing_category("connector"));
    }
}
