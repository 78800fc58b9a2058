//! Tracing subscriber initialization helpers.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global fmt subscriber. `filter` wins over `RUST_LOG`, which wins
/// over the `info` default.
///
/// Safe to call multiple times; subsequent calls will no-op.
pub fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
