use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{BountyConfig, LogFormat};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &BountyConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let subscriber = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => subscriber
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?,
        LogFormat::Pretty => subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .try_init()?,
    }
    Ok(())
}
