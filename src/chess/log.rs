use std::env;
use std::sync::LazyLock;

use tracing::level_filters::LevelFilter;

fn level_from_str(s: &str) -> LevelFilter {
    match s.to_lowercase().as_str() {
        "error" | "err" => LevelFilter::ERROR,
        "warn" | "warning" => LevelFilter::WARN,
        "info" => LevelFilter::INFO,
        "debug" => LevelFilter::DEBUG,
        "trace" => LevelFilter::TRACE,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::ERROR,
    }
}

static CHESS_LOG: LazyLock<LevelFilter> = LazyLock::new(|| {
    env::var("CHESS_LOG")
        .map(|s| level_from_str(&s))
        .unwrap_or(LevelFilter::ERROR)
});

/// Installs a stderr `fmt` subscriber at the `CHESS_LOG` level.
///
/// Later calls, or calls after another global subscriber was set, are no-ops.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(*CHESS_LOG)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
