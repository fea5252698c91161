//! Log output for applications built on the client.
//!
//! Library code only emits `tracing` events; installing a subscriber is
//! the application's call.

use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber filtered by `RUST_LOG`, defaulting to
/// `info`.
pub fn init() {
    init_with_default("info");
}

/// Like [`init`], with `directive` used when `RUST_LOG` is unset or
/// invalid.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_with_default(directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
