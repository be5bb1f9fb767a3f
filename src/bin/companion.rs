//! Execution agent daemon
//!
//! Listens on a local port and spawns flight scripts or generated code for
//! each request. Replies as soon as the process is running.

use clap::Parser;
use hero_bridge::agent::{AgentServer, ScriptRunner};
use hero_bridge::core::error::Result;
use hero_bridge::core::BridgeConfig;
use std::path::PathBuf;
use std::sync::Arc;

/// Execution agent for Hero Bridge
#[derive(Parser, Debug)]
#[command(name = "companion")]
#[command(about = "Spawn drone flight scripts and generated code on request")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Program used to run scripts (overrides config)
    #[arg(long)]
    interpreter: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let mut config = BridgeConfig::resolve(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.agent.port = port;
    }
    if let Some(interpreter) = args.interpreter {
        config.agent.interpreter = interpreter;
    }

    let runner = Arc::new(ScriptRunner::new(&config.agent));
    let server = AgentServer::start(runner.clone(), &config.agent).await?;
    println!("Companion on {}", server.port());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down execution agent");
    server.shutdown();
    let removed = runner.remove_pending_artifacts().await;
    if removed > 0 {
        tracing::info!(removed, "removed generated code of unfinished runs");
    }
    Ok(())
}
