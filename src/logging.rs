use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Output goes to stderr because stdout
/// carries the IPC protocol. Safe to call more than once.
pub fn init(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
