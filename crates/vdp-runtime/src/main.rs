//! # VDP Runtime
//!
//! Hosts the dispatcher and drives one loopback client session through the
//! full envelope path, printing each response as JSON.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logging + metrics)
//! 2. Load configuration from the environment
//! 3. Validate the session secret (warn only outside production)
//! 4. Build the service container and open a session
//! 5. Run the demo calls, then shut the worker pool down

use anyhow::{Context, Result};
use serde_json::json;
use shared_types::{InvocationDescriptor, InvocationResult, Value};
use std::time::Duration;
use tracing::{info, warn};
use vdp_runtime::{LoopbackSession, RuntimeConfig, ServiceContainer};
use vdp_telemetry::{encode_metrics, init_telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("failed to load configuration")?;
    let _telemetry =
        init_telemetry(config.telemetry.clone()).context("failed to initialize telemetry")?;

    info!("===========================================");
    info!("  VDP Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    if let Err(e) = config.validate_for_production() {
        warn!("{e}");
        warn!("Continuing with development settings");
    }

    let container = ServiceContainer::new(config).context("failed to start services")?;
    container.files().add("folder1/folder2/a.csv", b"id,name\n1,Ada\n".to_vec());
    container.files().add("folder1/folder2/b.csv", b"id,name\n2,Grace\n".to_vec());
    container.files().add("folder1/sample", b"sample".to_vec());

    let mut session = container.open_session("demo-session");
    run_demo(&mut session).await?;

    // Let any stray deferred completions land before reporting.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let stats = container.stats().snapshot();
    info!(
        received = stats.received,
        responses = stats.responses_sent,
        errors = stats.error_responses,
        pending = container.pending_completions(),
        "Demo finished"
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);
    if let Ok(metrics) = encode_metrics() {
        println!("{metrics}");
    }

    container.shutdown();
    Ok(())
}

async fn run_demo(session: &mut LoopbackSession) -> Result<()> {
    let calls = [
        (InvocationDescriptor::new("FileService", "listFiles", vec!["folder1/folder2".into()]), true),
        (InvocationDescriptor::new("FileService", "listFiles", vec!["folder1/*le".into()]), false),
        (InvocationDescriptor::new("FileService", "add", vec!["notes.txt".into(), "hello".into()]), true),
        (InvocationDescriptor::new("FileService", "read", vec!["notes.txt".into()]), true),
        (InvocationDescriptor::new("FileService", "remove", vec!["pathA".into()]), false),
        (InvocationDescriptor::new("QueryService", "execute", vec!["SELECT * FROM customers".into()]), true),
        (InvocationDescriptor::new("QueryService", "execute", vec!["SELECT * FROM ghosts".into()]), true),
        (InvocationDescriptor::new("Ghost", "anything", vec![]), false),
    ];

    for (descriptor, seal) in calls {
        let label = format!("{}.{}", descriptor.target_service_id, descriptor.operation_name);
        let response = session
            .call(descriptor, seal)
            .await
            .with_context(|| format!("call {label} failed"))?;
        let body = match &response.result {
            InvocationResult::Value(value) => json!({ "value": render(value) }),
            InvocationResult::Error(record) => json!({
                "error": {
                    "kind": record.kind.as_str(),
                    "message": record.message,
                    "category": record.category,
                }
            }),
        };
        let line = json!({
            "call": label,
            "correlation_key": response.correlation_key.to_string(),
            "sealed": response.sealed,
            "result": body,
        });
        println!("{line}");
    }
    Ok(())
}

fn render(value: &Value) -> serde_json::Value {
    match value {
        Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => json!({ "text": text }),
            Err(_) => json!({ "hex": hex::encode(bytes) }),
        },
        other => other.to_json(),
    }
}
