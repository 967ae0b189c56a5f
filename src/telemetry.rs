//! Tracing bootstrap shared by binaries and tests.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! the embedding application's job. [`init_tracing`] is the canonical setup
//! used by the demos and integration tests: env-filtered fmt output with span
//! lifecycle events plus a [`tracing_error::ErrorLayer`] so diagnostics carry
//! span traces.

use std::sync::Once;

use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Install the default subscriber if none is set yet.
///
/// Reads `RUST_LOG` when present, otherwise defaults to warnings plus this
/// crate's info events. Safe to call from every test; only the first call in
/// a process has any effect.
pub fn init_tracing() {
    INIT.call_once(|| {
        let fmt_layer = fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("warn,chatweave=info"))
            .expect("default filter directive is valid");

        // Another subscriber may already be installed (e.g. by a test
        // harness); that is fine, keep theirs.
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .with(ErrorLayer::default())
            .try_init()
            .ok();
    });
}
