//! # janusd
//!
//! Notes service over REST and gRPC.
//!
//! ## Startup
//! ```text
//! tracing ─► panic hook ─► DemoConfig::load ─► register executors
//!         ─► build host (topology, TLS) ─► bind ─► serve until SIGINT/SIGTERM
//! ```
//! Any failure before or while serving is logged and exits non-zero.

use std::process::ExitCode;
use std::sync::Arc;

use janus_core::topology::Protocol;
use janus_demo::notes::NoteStore;
use janus_demo::{build_host, build_invoker, DemoConfig, DemoResult};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Selects JSON log lines when set to `json`.
const LOG_FORMAT_VAR: &str = "JANUS_LOG_FORMAT";

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    janus_host::install_panic_hook();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "janusd stopped with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DemoResult<()> {
    info!("Starting janusd...");

    let config = DemoConfig::load()?;
    info!(
        host = %config.endpoint.host,
        grpc_port = config.endpoint.effective_grpc_port(),
        rest_port = config.endpoint.effective_rest_port(),
        tls = config.endpoint.has_tls(),
        invoke_timeout = ?config.invoke_timeout,
        "Configuration loaded"
    );

    let invoker = build_invoker(Arc::new(NoteStore::new()), config.invoke_timeout)?;
    info!(executors = ?invoker.registry().tags(), "Executors registered");

    let host = build_host(config.endpoint, invoker)?.bind().await?;
    info!(
        topology = %host.topology(),
        grpc = ?host.local_addr(Protocol::Grpc),
        rest = ?host.local_addr(Protocol::Rest),
        "Listening"
    );

    host.serve().await?;
    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    match std::env::var(LOG_FORMAT_VAR).as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}
