use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `TALLY_LOG=debug`
pub const LOG_ENV: &str = "TALLY_LOG";

/// Install a stderr subscriber. Defaults to warnings only so that normal
/// command output on stdout stays clean.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
