//! Log output for the CLI.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// # Environment
/// - RUST_LOG: filter directives (default: warn),
///   e.g. `RUST_LOG=blast_core=debug`
///
/// Logs go to stderr so `--json` output on stdout stays machine-readable.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();
}
