//! Development-time tracing.
//!
//! Tracing goes to stderr and is separate from the conversation output on
//! stdout. `--debug` output (history, raw responses) is printed by
//! [`crate::report`], not through this module.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn`, or `ollama_agent=debug` when `debug`
/// is set. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=ollama_agent=trace ollama-agent "list files"
/// ```
pub fn init(debug: bool) {
    let default = if debug { "warn,ollama_agent=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
