//! Initial engine head bootstrap

use rollup_engine::Driver;
use std::time::Duration;

/// Where a bootstrapped engine starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The engine reported its head
    Synced,
    /// The head query failed or timed out, the engine starts at genesis
    Genesis,
}

/// Query the engine head once within `timeout`, defaulting to genesis otherwise.
///
/// The driver is never left without heads.
pub async fn bootstrap_engine(driver: &dyn Driver, index: usize, timeout: Duration) -> BootstrapOutcome {
    let err = match tokio::time::timeout(timeout, driver.request_update()).await {
        Ok(Ok(())) => return BootstrapOutcome::Synced,
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("no answer within {:?}", timeout),
    };

    tracing::error!(
        "Failed to fetch head of engine {}, defaulting to genesis: {}",
        index,
        err
    );
    let genesis = driver.genesis();
    driver.update_head(genesis.l1, genesis.l2);
    BootstrapOutcome::Genesis
}
