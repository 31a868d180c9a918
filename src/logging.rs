//! Logging initialization for embedding applications
//!
//! The core is a library; the host UI decides when logging starts. Calling
//! [`init_logging`] more than once is harmless.

use tracing_subscriber::EnvFilter;

/// Install a global tracing subscriber honoring `RUST_LOG`
/// (default level: `info`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
