//! Run one request through a remote execution processor.
//!
//! ```text
//! rexec-worker <request.json|-> [job_id]
//! ```
//!
//! Configuration comes from the environment (see
//! [`ProcessorConfig::from_env`]). The request document may carry an
//! `"outputs"` member, used as the output selection; the rest is handed to
//! the passthrough adapter. Ctrl-C stops waiting for an asynchronous job
//! without aborting it.

use anyhow::Context;
use rexec_processor::adapters::PassthroughAdapter;
use rexec_processor::config::ProcessorConfig;
use rexec_processor::orchestrator::ExecutionOrchestrator;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

const DEFAULT_LOG_FILTER: &str = "rexec_worker=info,rexec_processor=info,rexec_remote=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mut args = std::env::args().skip(1);
    let source = args
        .next()
        .context("usage: rexec-worker <request.json|-> [job_id]")?;
    let job_id = args
        .next()
        .or_else(|| std::env::var("JOB_ID").ok())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let config = ProcessorConfig::from_env().context("Invalid processor configuration")?;
    let orchestrator = ExecutionOrchestrator::new(&config, PassthroughAdapter::new())
        .await
        .context("Failed to initialise processor")?;

    let mut request = read_request(&source).await?;
    let outputs = request.as_object_mut().and_then(|obj| obj.remove("outputs"));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, no longer waiting for the remote job");
                cancel.cancel();
            }
        });
    }

    tracing::info!(job_id = %job_id, mode = %orchestrator.mode(), "Executing job");
    let result = orchestrator
        .execute_with_cancel(&job_id, &request, outputs.as_ref(), &cancel)
        .await
        .with_context(|| format!("Job '{job_id}' failed"))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "job_id": job_id,
            "mimetype": result.mimetype,
            "outputs": result.outputs,
        }))?
    );
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    // Logs go to stderr so stdout carries only the result document.
    let fmt_layer = if std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json") {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

async fn read_request(source: &str) -> anyhow::Result<Value> {
    let raw = if source == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read request from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read request file '{source}'"))?
    };

    serde_json::from_str(&raw).context("Request is not valid JSON")
}
