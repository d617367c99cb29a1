//! Diagnostic logging setup.
//!
//! Logs go to stderr so stdout carries only command output and chat
//! replies. The filter comes from `RUST_LOG` when set.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,pdf_chat=info";

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
