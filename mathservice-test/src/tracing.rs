//! Log output for tests, in the same JSON shape the service writes in production.

use mathservice_server::observability::SortedJson;
use tracing_subscriber::EnvFilter;

/// Crates whose events are shown at every level. Everything else is limited to errors.
const CRATE_NAMES: &[&str] = &["mathservice_server", "loadtest"];

/// Installs a global subscriber that writes sorted-key JSON lines to the test output.
///
/// Output is captured by the test harness and only shown for failing tests. Calling this more
/// than once is harmless. `RUST_LOG` replaces the default filter.
///
/// # Example
///
/// ```
/// mathservice_test::tracing::init();
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        CRATE_NAMES.iter().fold(EnvFilter::new("ERROR"), |filter, name| {
            match format!("{name}=TRACE").parse() {
                Ok(directive) => filter.add_directive(directive),
                Err(_) => filter,
            }
        })
    });

    tracing_subscriber::fmt()
        .event_format(SortedJson)
        .with_env_filter(env_filter)
        .with_test_writer()
        .try_init()
        .ok();
}
