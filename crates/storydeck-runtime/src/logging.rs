#![forbid(unsafe_code)]

//! Subscriber installation for hosts without their own `tracing` setup.
//!
//! Hosts that already own a subscriber should skip this module; every event
//! the runtime emits goes through plain `tracing` macros.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "storydeck_runtime=info,storydeck_core=warn";

/// Install a global JSON subscriber honoring `RUST_LOG`.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_subscriber() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
}
