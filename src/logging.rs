//! Tracing subscriber setup.
//!
//! Hosts embedding the engine usually install their own subscriber; this is
//! for standalone tools and tests.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "recolor=info";

static INIT: OnceCell<()> = OnceCell::new();

/// Install a fmt subscriber filtered by `RUST_LOG` (default `recolor=info`).
///
/// Safe to call more than once. Fails only if some other global subscriber
/// was installed first.
pub fn init_logging() -> anyhow::Result<()> {
    INIT.get_or_try_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
    })?;
    Ok(())
}
