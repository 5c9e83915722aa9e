//! # Example: nested containers end to end
//!
//! Launches an executor container with two children, waits on one, kills the
//! other and bumps the log level for a moment.
//!
//! Each call goes through `Agent::dispatch_raw` with a JSON-decoded call, as a
//! transport would.
//!
//! ## Run
//! ```bash
//! cargo run --example nested_containers --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use nodevisor::{
    Agent, Config, ContainerId, LogWriter, ManualBackend, RawCall, Subscribe, TracingVerbosity,
};

async fn call(agent: &Agent, json: serde_json::Value) -> anyhow::Result<serde_json::Value> {
    let raw: RawCall = serde_json::from_value(json)?;
    let resp = agent.dispatch_raw(raw).await?;
    Ok(serde_json::to_value(resp)?)
}

fn launch(id: &ContainerId) -> serde_json::Value {
    serde_json::json!({
        "type": "LAUNCH_NESTED_CONTAINER",
        "launch_nested_container": {
            "container_id": id,
            "command": { "value": "sleep 1000", "arguments": [] },
            "resources": [{ "name": "cpus", "value": 0.5 }],
        }
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::default();
    let verbosity = Arc::new(TracingVerbosity::install(cfg.logging_level)?);
    let backend = Arc::new(ManualBackend::new());
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let agent = Agent::builder(cfg)
        .with_backend(backend.clone())
        .with_verbosity(verbosity)
        .with_subscribers(subs)
        .build();

    let executor = ContainerId::generate(None);
    let worker = ContainerId::generate(Some(executor.clone()));
    let sidecar = ContainerId::generate(Some(executor.clone()));
    for id in [&executor, &worker, &sidecar] {
        call(&agent, launch(id)).await?;
    }

    let waiter = tokio::spawn({
        let agent = agent.clone();
        let worker = worker.clone();
        async move {
            call(
                &agent,
                serde_json::json!({
                    "type": "WAIT_NESTED_CONTAINER",
                    "wait_nested_container": { "container_id": worker },
                }),
            )
            .await
        }
    });

    call(
        &agent,
        serde_json::json!({
            "type": "SET_LOGGING_LEVEL",
            "set_logging_level": { "level": 1, "duration": { "secs": 1, "nanos": 0 } },
        }),
    )
    .await?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    backend.exit(&worker, Some(0));
    println!("wait -> {}", waiter.await??);

    call(
        &agent,
        serde_json::json!({
            "type": "KILL_NESTED_CONTAINER",
            "kill_nested_container": { "container_id": sidecar },
        }),
    )
    .await?;

    let containers = call(&agent, serde_json::json!({ "type": "GET_CONTAINERS" })).await?;
    println!("{}", serde_json::to_string_pretty(&containers)?);

    let metrics = call(
        &agent,
        serde_json::json!({ "type": "GET_METRICS", "get_metrics": { "timeout": null } }),
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    tokio::time::sleep(Duration::from_millis(1200)).await;
    agent.shutdown().await?;
    Ok(())
}
