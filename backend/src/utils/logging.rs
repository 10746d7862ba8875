use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "kindred=info,tower_http=debug,server=debug,match_sweeper=debug";

pub fn init_logging() {
    init_logging_with(DEFAULT_LOG_FILTER);
}

/// Installs the fmt subscriber. `RUST_LOG` wins over `default_filter`.
/// Later calls are ignored.
pub fn init_logging_with(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
