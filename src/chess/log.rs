use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `PGN_MERGE_LOG=debug`.
pub const LOG_ENV: &str = "PGN_MERGE_LOG";

const DEFAULT_FILTER: &str = "info";

fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the stderr subscriber. Safe to call more than once; later calls
/// keep the first subscriber.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
