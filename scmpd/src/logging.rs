use time::macros::format_description;
use time::UtcOffset;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// `-v` levels, quietest to loudest: 0 is fully silent, 4 is debug.
fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "off",
        1 => "error",
        2 => "warn",
        3 => "info",
        _ => "debug",
    }
}

/// Initialize the global `tracing` subscriber. Mirrors the teacher's
/// local-time formatted layer, driven here by `-v` instead of `RUST_LOG`
/// (an explicit `RUST_LOG` still wins, via `EnvFilter::from_default_env`
/// merged under the verbosity-derived default).
pub fn init(verbosity: u8) {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let default_level = level_for_verbosity(verbosity);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("scmpd={default_level}")));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(OffsetTime::new(
            offset,
            format_description!("[day].[month].[year] [hour]:[minute]:[second]"),
        ))
        .with_filter(env_filter);

    tracing_subscriber::registry().with(fmt_layer).init();
}
