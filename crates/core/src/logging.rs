//! Logging initialization and configuration.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,lumen=debug";

/// Initialize the logging system with tracing.
///
/// This sets up tracing-subscriber with:
/// - Environment-based filtering (RUST_LOG)
/// - Targets and thread ids on every line, since the window and the
///   frame loop run on different threads
///
/// # Example
/// ```
/// lumen_core::init_logging();
/// tracing::info!("Renderer initialized");
/// ```
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init();
}
