use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a log subscriber for the test binary, once.
///
/// Output goes through the test harness, so it is only shown for failing tests.
pub fn setup_test_environment() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing_core::Level::DEBUG)
            .with_test_writer()
            .with_target(true)
            .with_line_number(true)
            .try_init()
            .ok();
    });
}
