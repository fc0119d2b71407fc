//! Tracing setup for hosts embedding the engine.
//!
//! Call [`init`] once at startup; it is a no-op if a global subscriber is
//! already installed, so tests and embedding applications can call it
//! unconditionally.

use std::io::IsTerminal;

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the default tracing subscriber.
///
/// The filter comes from `RUST_LOG` (after loading `.env` via dotenvy) and
/// falls back to `info`. ANSI colors are enabled when stderr is a terminal.
/// Also installs an [`ErrorLayer`] so spans are captured into error reports.
pub fn init() {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true);

    // try_init: keep whatever subscriber the host already installed.
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
        .ok();
}
