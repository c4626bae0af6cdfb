//! Log output for applications embedding the client.
//!
//! The library only emits `tracing` events. Call [`init`] once at startup to print
//! them; `RUST_LOG` takes precedence over the default filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "creative_ai_client=info";

/// Installs a global fmt subscriber. Returns `false` if one was already installed.
pub fn init(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
