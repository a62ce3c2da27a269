use tracing_subscriber::EnvFilter;

const FALLBACK_FILTER_ENV: &str = "MATCHDAY_LOG";

/// Installs the stderr subscriber. `RUST_LOG` wins over `MATCHDAY_LOG`; default is `info`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(FALLBACK_FILTER_ENV))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
