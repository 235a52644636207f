//! Tracing setup: structured JSON logs plus span names for each pipeline stage.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Span names as constants for programmatic use.
pub mod names {
    pub const SEARCH: &str = "sift.search";
    pub const RECALL: &str = "sift.recall";
    pub const EXPAND: &str = "sift.expand";
    pub const RERANK: &str = "sift.rerank";
    pub const PATHS: &str = "sift.paths";
}

/// Initialize the tracing subscriber with structured JSON output.
///
/// Respects the `SIFT_LOG` environment variable for filtering and defaults
/// to `info`. Safe to call more than once; only the first call installs.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("SIFT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .try_init();
    });
}

/// Initialize tracing with a custom filter string (for tests or embedding).
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing_with_filter(filter: &str) -> bool {
    let filter = EnvFilter::new(filter);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .json()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_harmless() {
        init_tracing();
        init_tracing();
        assert!(!init_tracing_with_filter("debug"));
    }
}
