//! # Runtime Configuration
//!
//! Unified configuration for telemetry, the dispatcher, and session security.
//!
//! ## Security Requirements
//!
//! - `session_secret` MUST NOT be the default zero value in production
//! - Session keys are derived from the secret per session id, never used raw

use shared_crypto::{Cipher, SecretKey};
use thiserror::Error;
use vdp_dispatcher::{ConfigError, DispatcherConfig, PoolError, RegistryError};
use vdp_telemetry::TelemetryConfig;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Logging and metrics.
    pub telemetry: TelemetryConfig,
    /// Worker pool and failure classification.
    pub dispatcher: DispatcherConfig,
    /// Payload sealing.
    pub security: SecurityConfig,
}

impl RuntimeConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Fails on malformed values; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, RuntimeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Telemetry settings are always read from the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RuntimeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut security = SecurityConfig::default();

        if let Some(secret_hex) = lookup("VDP_SESSION_SECRET") {
            let bytes = hex::decode(secret_hex.trim())
                .map_err(|e| RuntimeError::InvalidSecret(e.to_string()))?;
            security.session_secret = SecretKey::from_slice(&bytes).map_err(|_| {
                RuntimeError::InvalidSecret(format!(
                    "VDP_SESSION_SECRET must be 32 bytes (64 hex chars), got {}",
                    bytes.len()
                ))
            })?;
        }
        if let Some(cipher) = lookup("VDP_CIPHER") {
            security.cipher = cipher.trim().parse().map_err(RuntimeError::InvalidCipher)?;
        }

        Ok(Self {
            telemetry: TelemetryConfig::from_env(),
            dispatcher: DispatcherConfig::from_lookup(&lookup)?,
            security,
        })
    }

    /// Validate configuration for production readiness.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - the session secret is the default zero value
    /// - the dispatcher configuration is invalid
    pub fn validate_for_production(&self) -> Result<(), RuntimeError> {
        if self.security.session_secret.is_zero() {
            return Err(RuntimeError::InsecureSessionSecret);
        }
        self.dispatcher.validate()?;
        Ok(())
    }
}

/// Security configuration.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Master secret session keys are derived from.
    pub session_secret: SecretKey,
    /// Cipher used to seal payloads.
    pub cipher: Cipher,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            session_secret: SecretKey::from_bytes([0u8; 32]),
            cipher: Cipher::default(),
        }
    }
}

/// Runtime startup errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Session secret is not set (zero value).
    #[error(
        "SECURITY VIOLATION: session secret is default zero value. \
         Set VDP_SESSION_SECRET environment variable."
    )]
    InsecureSessionSecret,

    /// Session secret could not be parsed.
    #[error("invalid session secret: {0}")]
    InvalidSecret(String),

    /// Unknown cipher name.
    #[error("invalid cipher: {0}")]
    InvalidCipher(String),

    /// Dispatcher configuration rejected.
    #[error(transparent)]
    Dispatcher(#[from] ConfigError),

    /// Worker pool could not be created.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// A bundled service failed to register.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
