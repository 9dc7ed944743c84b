//! Tracing setup for the command-line driver.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install the global subscriber, once.
///
/// Nothing is installed unless `RUST_LOG` is set. With `SDSLC_TRACE_TREE`
/// also set, spans are drawn as an indented tree instead of flat lines.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};
        use tracing_tree::HierarchicalLayer;

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let tree = std::env::var("SDSLC_TRACE_TREE").is_ok();
        let filter = EnvFilter::from_default_env();
        let flat = (!tree).then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
        });
        let nested = tree.then(|| {
            HierarchicalLayer::new(2)
                .with_writer(std::io::stderr)
                .with_targets(true)
                .with_bracketed_fields(true)
        });
        tracing_subscriber::registry()
            .with(filter)
            .with(flat)
            .with(nested)
            .init();
    });
}
