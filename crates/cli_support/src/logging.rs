//! Console logging for the binaries.

use time::macros::format_description;
use time::UtcOffset;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install the global fmt subscriber. `RUST_LOG` overrides the `info` default.
///
/// Calling it twice (tests, nested tools) is harmless: the second install is ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let timer = OffsetTime::new(
        local_offset(),
        format_description!("[hour]:[minute]:[second].[subsecond digits:3]"),
    );
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_target(false)
        .try_init();
}

fn local_offset() -> UtcOffset {
    // Fails on multi-threaded processes on some platforms; call before spawning threads.
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}
