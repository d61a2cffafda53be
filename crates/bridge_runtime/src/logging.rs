//! Logging setup for shared libraries.
//!
//! A service library has no `main`, so the subscriber is installed lazily on
//! the first boundary call that starts a service.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::BridgeConfig;

/// Filter used when neither `RUST_LOG` nor the config file sets one.
pub const DEFAULT_FILTER: &str = "bridge_runtime=info";

static INIT: Once = Once::new();

/// Install the stderr subscriber once per process.
///
/// Leaves an already installed global subscriber (the host's, or a test
/// harness's) untouched.
pub fn init() {
    INIT.call_once(|| {
        let config = BridgeConfig::global();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(config.logging.filter.as_deref().unwrap_or(DEFAULT_FILTER))
        });

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .is_ok();

        if let Some(e) = BridgeConfig::load_error() {
            tracing::warn!(error = %e, "Using default configuration");
        }
        tracing::debug!(installed, "Logging initialized");
    });
}
