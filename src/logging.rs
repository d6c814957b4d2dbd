use std::path::Path;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber.
///
/// Human-readable output goes to stderr, since stdout may carry the scrape
/// config. With `log_dir` set, a daily-rotated JSON file `{app}.log` is added.
pub fn init_logging(app: &str, log_dir: Option<&Path>) {
    let file_layer = log_dir.map(|dir| {
        fmt::layer()
            .with_writer(rolling::daily(dir, format!("{app}.log")))
            .with_ansi(false)
            .json()
    });

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    // Default to `info` level if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
}
