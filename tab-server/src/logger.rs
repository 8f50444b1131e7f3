//! Logging setup
//!
//! `RUST_LOG` wins when set; otherwise `default_filter` applies.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "tab_server=info,tower_http=info";

/// Initialize the global subscriber
///
/// # Arguments
/// * `default_filter` - Directives used when `RUST_LOG` is unset
/// * `json_format` - JSON lines (production) instead of human-readable output
pub fn init_logger(default_filter: &str, json_format: bool) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_ansi(true))
            .try_init()?;
    }

    Ok(())
}
