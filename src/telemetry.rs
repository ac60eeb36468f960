use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};

/// Fallback filter when neither the config nor `RUST_LOG` sets one.
pub const DEFAULT_FILTER: &str = "info,assistant_relay=debug";

/// Initialize structured logging.
///
/// Filter precedence: `logging.filter`, then `RUST_LOG`, then
/// [`DEFAULT_FILTER`]. Output is compact text or one JSON object per line.
pub fn init(logging: &LoggingConfig) {
    let filter_layer = logging
        .filter
        .as_deref()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter_layer);

    match logging.format {
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .init(),
    }
}
