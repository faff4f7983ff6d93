//! Logging setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events the default filter lets through.
const CRATES: &[&str] = &[
    "bingo",
    "bingo_transport",
    "bingo_protocol",
    "bingo_session",
    "bingo_draw",
    "bingo_timer",
    "bingo_room",
    "bingo_hall",
];

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_level` for the Bingo Hall crates.
///
/// Calling it again after a subscriber is installed does nothing.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

fn default_directives(level: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}
