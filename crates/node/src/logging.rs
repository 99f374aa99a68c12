//! Tracing subscriber setup

use crate::{ConfigError, LogConfig, LogFormat};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the level filter. `RUST_LOG` takes precedence over the configured level.
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let level = config.level_filter()?;
    Ok(EnvFilter::default().add_directive(level.into()))
}

/// Install the global tracing subscriber
pub fn init_tracing(config: &LogConfig) -> Result<(), ConfigError> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);
    let result = match config.format {
        LogFormat::Text => registry
            .with(fmt::layer().with_ansi(config.color))
            .try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    result.map_err(|e| ConfigError::Log(e.to_string()))
}
