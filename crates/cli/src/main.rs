//! Rollup Node
//!
//! Main entry point of the rollup consensus-layer node.
//! Follows the configured L1 endpoints and keeps every configured L2
//! execution engine in sync until interrupted.

use anyhow::Result;
use clap::Parser;
use rollup_node::{init_tracing, RollupNode, RpcDialer};

mod config;

use config::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;

    // Initialize logging
    init_tracing(&config.log)?;

    let genesis = config.genesis();
    tracing::info!("Starting rollup node");
    tracing::info!("  L1 endpoints: {}", config.l1_node_addrs.join(", "));
    tracing::info!("  L2 engines: {}", config.l2_engine_addrs.len());
    tracing::info!("  Genesis: L1 {} / L2 {}", genesis.l1, genesis.l2);

    let dialer = RpcDialer::new(config.runtime.dial_timeout, config.runtime.poll_interval);
    let node = RollupNode::new(&config, &dialer).await?;
    node.start().await?;

    tracing::info!("Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    if let Err(e) = node.stop().await {
        for err in e.errors() {
            tracing::error!("Teardown error: {}", err);
        }
        return Err(e.into());
    }

    tracing::info!("Rollup node stopped");
    Ok(())
}
