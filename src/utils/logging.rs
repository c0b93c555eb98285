use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

pub const CLI_PREFIX: &str = "cli";

/// Level of the file log when `RUST_LOG` is not set.
const DEFAULT_FILE_LEVEL: &str = "debug";

/// Routes `tracing` output of the crate into two places:
///  - daily rolling files under `<state dir>/logs`, always on, at `RUST_LOG` or [DEFAULT_FILE_LEVEL].
///  - stderr at `console_level`, only when one is given, so regular command output stays clean.
pub fn enable_logging(
    prefix: &str,
    state_dir: &Path,
    console_level: Option<LevelFilter>,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(5)
        .filename_prefix(prefix)
        .build(state_dir.join("logs"))?;

    let file_level = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILE_LEVEL.into());
    let file = fmt::layer()
        .with_writer(appender)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(crate_filter(&file_level));

    let console = console_level.map(|level| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .pretty()
            .with_filter(crate_filter(&level.to_string()))
    });

    tracing_subscriber::registry()
        .with(file)
        .with(console)
        .try_init()?;
    Ok(())
}

/// Keeps events of this crate at `level` and drops everything from dependencies.
fn crate_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "{}={level}",
        env!("CARGO_PKG_NAME").replace("-", "_"),
    ))
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});
