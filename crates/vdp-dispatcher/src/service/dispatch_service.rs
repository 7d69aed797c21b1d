//! # Dispatch Service
//!
//! Implements the [`DispatchApi`] port: each envelope becomes one job on the
//! shared worker pool and the caller returns immediately.

use shared_types::CorrelationKey;
use std::sync::Arc;
use tracing::trace;

use super::dispatcher::Dispatcher;
use super::reporting::TARGET;
use crate::adapters::worker_pool::WorkerPool;
use crate::ports::inbound::DispatchApi;

/// A connection's dispatcher bound to the shared worker pool.
#[derive(Clone)]
pub struct DispatchService {
    dispatcher: Arc<Dispatcher>,
    pool: WorkerPool,
}

impl DispatchService {
    /// Bind `dispatcher` to `pool`.
    pub fn new(dispatcher: Dispatcher, pool: WorkerPool) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            pool,
        }
    }

    /// The wrapped dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The worker pool jobs are submitted to.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

impl DispatchApi for DispatchService {
    fn dispatch(&self, raw_envelope: Vec<u8>, correlation_key: CorrelationKey) {
        trace!(target: TARGET, %correlation_key, len = raw_envelope.len(), "Queueing envelope");
        let dispatcher = Arc::clone(&self.dispatcher);
        self.pool
            .submit(move || dispatcher.dispatch(&raw_envelope, correlation_key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::client::SessionClient;
    use crate::adapters::connection::{ChannelSink, ClientConnection};
    use crate::domain::classification::CategoryPolicy;
    use crate::domain::fault::ServiceFault;
    use crate::domain::operation::{OperationTable, RemoteService};
    use crate::domain::registry::ServiceRegistry;
    use crate::domain::signature::ParamType;
    use crate::domain::Deferred;
    use shared_crypto::{Cipher, CryptoContext, SecretKey, SessionCryptor};
    use shared_types::{InvocationDescriptor, InvocationResult, Value};
    use std::collections::HashSet;
    use std::sync::Barrier;
    use std::time::Duration;

    struct Slow {
        gate: Arc<Barrier>,
    }

    impl RemoteService for Slow {
        fn operations(table: &mut OperationTable<Self>) {
            table
                .sync("block", &[], |svc, _, _| {
                    svc.gate.wait();
                    Ok(Value::from("unblocked"))
                })
                .sync("fast", &[ParamType::Int], |_, _, args| Ok(Value::Int(args.int(0)?)))
                .deferred("later", &[ParamType::Int], |_, _, args| {
                    let n = args.int(0)?;
                    Ok(Some(Deferred::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        if n < 0 {
                            return Err(ServiceFault::processing("negative"));
                        }
                        Ok(Value::Int(n * 2))
                    })))
                });
        }
    }

    fn service(
        pool_size: usize,
        gate: Arc<Barrier>,
    ) -> (
        DispatchService,
        SessionClient,
        tokio::sync::mpsc::UnboundedReceiver<crate::adapters::connection::OutboundEnvelope>,
    ) {
        let crypto: Arc<dyn CryptoContext> = Arc::new(SessionCryptor::new(
            Cipher::Aes256Gcm,
            SecretKey::generate(),
        ));
        let registry = ServiceRegistry::builder()
            .register("Slow", Arc::new(Slow { gate }), "SLOW")
            .unwrap()
            .build();
        let (sink, rx) = ChannelSink::new();
        let connection = Arc::new(ClientConnection::new(
            "session-1",
            Arc::clone(&crypto),
            Arc::new(sink),
        ));
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            Arc::new(CategoryPolicy::default()),
            connection,
        );
        let pool = WorkerPool::new(pool_size).unwrap();
        (
            DispatchService::new(dispatcher, pool),
            SessionClient::new(crypto),
            rx,
        )
    }

    fn request(client: &SessionClient, op: &str, args: Vec<Value>) -> (Vec<u8>, CorrelationKey) {
        client
            .encode_request(InvocationDescriptor::new("Slow", op, args), true)
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispatch_returns_before_invocation() {
        let gate = Arc::new(Barrier::new(2));
        let (service, client, mut rx) = service(2, Arc::clone(&gate));

        let (bytes, key) = request(&client, "block", vec![]);
        service.dispatch(bytes, key);
        assert!(rx.try_recv().is_err());

        tokio::task::spawn_blocking(move || {
            gate.wait();
        })
        .await
        .unwrap();

        let out = rx.recv().await.unwrap();
        let response = client.decode_response(&out.bytes, out.correlation_key).unwrap();
        assert_eq!(response.correlation_key, key);
        assert_eq!(response.result.value(), Some(&Value::from("unblocked")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_responses_correlate_out_of_order() {
        let gate = Arc::new(Barrier::new(1));
        let (service, client, mut rx) = service(4, gate);

        let mut expected = HashSet::new();
        for n in 0..8 {
            let op = if n % 2 == 0 { "fast" } else { "later" };
            let (bytes, key) = request(&client, op, vec![Value::Int(n)]);
            expected.insert(key);
            service.dispatch(bytes, key);
        }

        let mut seen = HashSet::new();
        for _ in 0..8 {
            let out = rx.recv().await.unwrap();
            let response = client.decode_response(&out.bytes, out.correlation_key).unwrap();
            assert!(response.sealed);
            assert!(!response.result.is_error());
            assert!(seen.insert(response.correlation_key));
        }
        assert_eq!(seen, expected);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(service.dispatcher().pending_completions(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_deferred_failure_single_response() {
        let gate = Arc::new(Barrier::new(1));
        let (service, client, mut rx) = service(1, gate);

        let (bytes, key) = request(&client, "later", vec![Value::Int(-1)]);
        service.dispatch(bytes, key);

        let out = rx.recv().await.unwrap();
        let response = client.decode_response(&out.bytes, out.correlation_key).unwrap();
        assert!(matches!(response.result, InvocationResult::Error(_)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(service.dispatcher().stats().responses_sent, 1);
    }
}
