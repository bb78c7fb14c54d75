//! Tracing subscriber initialization
//!
//! Logs go to stderr so they never interleave with chat output on stdout.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Respects `RUST_LOG`; otherwise logs at `info` (or `debug` when `debug` is
/// set). Calling it more than once is harmless.
pub fn init_logging(debug: bool) {
    let default_level = if debug { "multichat=debug" } else { "multichat=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

/// Run `f` with a plain warn-level stderr subscriber in scope.
///
/// Used for work that happens before the configured subscriber exists,
/// such as reading the config file that decides the log level.
pub fn with_startup_logging<T>(f: impl FnOnce() -> T) -> T {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("multichat=warn"))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}
