use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber. `RUST_LOG` takes precedence
/// when set; otherwise `default_level` (the CLI's `--log-level`) is used.
/// Structured log events go to stderr so stdout stays free for progress and
/// the final result summary.
pub fn init(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
