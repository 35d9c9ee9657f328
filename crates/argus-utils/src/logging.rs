//! Logging and tracing utilities

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the default `info` filter.
///
/// Intended for binaries and examples; library code only emits events and
/// never installs a subscriber. `RUST_LOG` overrides the default.
pub fn init_tracing() {
    init_tracing_with("info");
}

/// Initialize the tracing subscriber with an explicit default filter.
///
/// The filter is used only when `RUST_LOG` is unset.
pub fn init_tracing_with(default_directive: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
