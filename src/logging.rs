//! Subscriber setup for binaries and tests embedding the crate.
//!
//! The library itself only emits `tracing` events; nothing is printed unless
//! a subscriber is installed.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "index_tasks=info";

/// Install a fmt subscriber filtered by `RUST_LOG` (or [`DEFAULT_FILTER`]).
///
/// Returns `false` if a global subscriber was already set.
pub fn init_logging() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_reports_existing_subscriber() {
        let _ = init_logging();
        assert!(!init_logging());
    }
}
