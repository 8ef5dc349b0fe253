//! Tracing setup
//!
//! Library code only emits `tracing` events. Binaries and test harnesses
//! call [`init_tracing`] once to get formatted output filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,scout_core=info,scout_scenario=info";

/// Install a global fmt subscriber
///
/// `RUST_LOG` wins over `default_filter`. Returns `false` if a global
/// subscriber was already installed, which makes repeated calls harmless.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
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
    fn second_init_is_harmless() {
        let _ = init_tracing(DEFAULT_FILTER);
        assert!(!init_tracing(DEFAULT_FILTER));
    }
}
