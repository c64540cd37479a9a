//! Logging setup for Apps embedding the store.
//!
//! The library itself only emits `tracing` events. Apps that have no
//! subscriber of their own can call [`init_logging`] once at startup.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"info"` or `"tc_playbook=debug"`).
///
/// Returns `false` if a global subscriber was already installed; calling
/// it more than once is harmless.
pub fn init_logging(default_directive: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init_logging("warn");
        assert!(!init_logging("debug"));
    }
}
