use std::path::Path;

use time::macros::format_description;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
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

/// Initialize logging to `logfile` (spec.md §6, `-l/--logfile`). The
/// returned guard must be kept alive for the process lifetime so the
/// non-blocking writer flushes on drop.
pub fn init(logfile: &Path, verbosity: u8) -> anyhow::Result<WorkerGuard> {
    let dir = logfile.parent().filter(|p| !p.as_os_str().is_empty());
    let filename = logfile
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("logfile path has no file name: {}", logfile.display()))?;

    let file_appender = tracing_appender::rolling::never(
        dir.unwrap_or_else(|| Path::new(".")),
        filename,
    );
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let default_level = level_for_verbosity(verbosity);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("scmpd_updater={default_level}")));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(OffsetTime::new(
            offset,
            format_description!("[day].[month].[year] [hour]:[minute]:[second]"),
        ))
        .with_filter(env_filter);

    tracing_subscriber::registry().with(fmt_layer).init();
    Ok(guard)
}
