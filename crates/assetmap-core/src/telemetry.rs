//! Logging setup for hosts embedding the core.

use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install a compact fmt subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the crate logs at `debug` when
/// `debug` is set and `info` when not. Returns false if a global subscriber
/// was already installed.
pub fn init_tracing(debug: bool) -> bool {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("assetmap_core={}", level)));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .try_init()
        .is_ok()
}
