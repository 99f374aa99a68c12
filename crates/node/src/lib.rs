//! Rollup Node - runtime core of the rollup consensus-layer node
//!
//! This crate wires the node together:
//! - Endpoint resolution for L1 sources and execution engines
//! - Time-bounded engine bootstrap with a genesis fallback
//! - One resubscribing L1 head subscription fanned out to every engine
//! - A lifecycle coordinator with an ordered, synchronous shutdown

pub mod bootstrap;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod fanout;
pub mod lifecycle;
pub mod logging;
pub mod node;
pub mod supervisor;


pub use bootstrap::{bootstrap_engine, BootstrapOutcome};
pub use config::{LogConfig, LogFormat, NodeConfig, RuntimeConfig};
pub use endpoints::{Dialer, EndpointSet, EngineEndpoint, RpcDialer};
pub use error::{ConfigError, NodeError, ShutdownError, TeardownError};
pub use fanout::HeadFanout;
pub use lifecycle::{CoordinatorHandle, LifecycleCoordinator};
pub use logging::init_tracing;
pub use node::RollupNode;
pub use supervisor::HeadSubscriptionSupervisor;
