//! Tracing setup (ambient, SPEC_FULL.md §2).
//!
//! Installed once from `main`; every module logs through `tracing`'s
//! macros rather than `println!`, honoring `RUST_LOG` via `EnvFilter`.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Call once, from `main`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
