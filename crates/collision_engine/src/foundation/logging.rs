//! Logging setup for binaries and tests driving the collision core

pub use log::{debug, info, warn, error, trace};

/// Initialize logging from `RUST_LOG`, falling back to `default_filter`
///
/// Safe to call more than once; later calls are ignored.
pub fn init(default_filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();
}

/// Initialize logging for unit tests (captured by the test harness)
#[cfg(test)]
pub(crate) fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
