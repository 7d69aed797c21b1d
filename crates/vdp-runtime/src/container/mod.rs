//! # Service Container
//!
//! Holds what every client session shares: the frozen service registry, the
//! worker pool, the classification policy, and the master session secret.
//!
//! ## Startup Order
//!
//! 1. Build the bundled services
//! 2. Register them and freeze the registry
//! 3. Create the worker pool on the current runtime
//! 4. Open sessions on demand, each with its own derived key

pub mod config;

pub use config::{RuntimeConfig, RuntimeError, SecurityConfig};

use shared_crypto::{CryptoContext, SessionCryptor};
use std::sync::Arc;
use tracing::info;
use vdp_dispatcher::{
    CategoryPolicy, ChannelSink, ClientConnection, CompletionRegistrar, DispatchService,
    DispatchStats, Dispatcher, ServiceRegistry, WorkerPool,
};
use vdp_telemetry::log_session_event;

use crate::services::{FileService, QueryService, FILE_SERVICE, QUERY_SERVICE};
use crate::session::LoopbackSession;

/// Shared runtime state.
pub struct ServiceContainer {
    config: RuntimeConfig,
    registry: Arc<ServiceRegistry>,
    policy: Arc<CategoryPolicy>,
    pool: WorkerPool,
    stats: Arc<DispatchStats>,
    registrar: CompletionRegistrar,
    files: Arc<FileService>,
}

impl ServiceContainer {
    /// Build the container. Must run inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if the dispatcher configuration is invalid, a service fails to
    /// register, or no runtime is available for the worker pool.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.dispatcher.validate()?;

        let files = Arc::new(FileService::new());
        let registry = ServiceRegistry::builder()
            .register(FILE_SERVICE, Arc::clone(&files), "FILES")?
            .register(QUERY_SERVICE, Arc::new(QueryService::with_sample_tables()), "QUERY")?
            .build();
        info!(services = ?registry.service_ids(), "Service registry frozen");

        let pool = WorkerPool::new(config.dispatcher.worker_pool_size)?;
        info!(workers = pool.size(), "Worker pool ready");

        Ok(Self {
            policy: Arc::new(config.dispatcher.policy()),
            registry: Arc::new(registry),
            pool,
            stats: Arc::new(DispatchStats::default()),
            registrar: CompletionRegistrar::new(),
            files,
            config,
        })
    }

    /// Open a loopback session: a dispatcher bound to a channel connection
    /// plus a client codec sharing the session's derived key.
    pub fn open_session(&self, session_id: &str) -> LoopbackSession {
        let crypto: Arc<dyn CryptoContext> = Arc::new(SessionCryptor::for_session(
            self.config.security.cipher,
            &self.config.security.session_secret,
            session_id,
        ));
        let (sink, rx) = ChannelSink::new();
        let connection = Arc::new(ClientConnection::new(
            session_id,
            Arc::clone(&crypto),
            Arc::new(sink),
        ));
        let dispatcher = Dispatcher::new(Arc::clone(&self.registry), self.policy.clone(), connection)
            .with_default_context(self.config.dispatcher.default_log_context.clone())
            .with_stats(Arc::clone(&self.stats))
            .with_registrar(self.registrar.clone());

        log_session_event!(
            info,
            "SESSION",
            "Session opened",
            session_id,
            cipher = self.config.security.cipher.as_str()
        );
        LoopbackSession::new(DispatchService::new(dispatcher, self.pool.clone()), crypto, rx)
    }

    /// The frozen registry.
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Counters shared by all sessions.
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Deferred completions outstanding across all sessions.
    pub fn pending_completions(&self) -> usize {
        self.registrar.pending()
    }

    /// The bundled file service, for seeding.
    pub fn files(&self) -> &FileService {
        &self.files
    }

    /// The active configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Stop the worker pool.
    pub fn shutdown(&self) {
        self.pool.shutdown();
        info!("Worker pool stopped");
    }
}
