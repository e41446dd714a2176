/*!
Logging and profiling setup for the command line.

Two implementations expose the same `setup_logging` entry point:

- real: compiled with `feature = "profiling"`. Adds a `tracing-chrome` layer
  next to the fmt layer; the trace file is flushed when the returned guard drops.
- stub: every other configuration. Logging only.

Logs go to stderr so that the JSON report on stdout stays machine readable.
*/

/// Filter used when neither RUST_LOG nor `--log-level` is given
const DEFAULT_FILTER: &str = "info";

fn env_filter(level: Option<&str>) -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    match std::env::var("RUST_LOG") {
        Ok(value) if !value.is_empty() => EnvFilter::new(value),
        _ => EnvFilter::new(level.unwrap_or(DEFAULT_FILTER)),
    }
}

#[cfg(feature = "profiling")]
mod inner {
    use tracing_chrome::{ChromeLayerBuilder, FlushGuard};
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    /// Keeps the chrome trace open; dropping it writes the file
    pub struct LoggingGuard {
        _chrome: FlushGuard,
    }

    /// Initialize logging plus a chrome trace layer
    pub fn setup_logging(level: Option<&str>) -> LoggingGuard {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(super::env_filter(level));
        let (chrome_layer, guard) = ChromeLayerBuilder::new().include_args(true).build();

        tracing_subscriber::registry()
            .with(chrome_layer)
            .with(fmt_layer)
            .init();

        tracing::info!("Tracing initialized with chrome profiling layer");
        LoggingGuard { _chrome: guard }
    }
}

#[cfg(not(feature = "profiling"))]
mod inner {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    /// Nothing to flush without the profiling feature
    pub struct LoggingGuard;

    /// Initialize logging; profiling is a no-op here.
    pub fn setup_logging(level: Option<&str>) -> LoggingGuard {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(super::env_filter(level));
        tracing_subscriber::registry().with(fmt_layer).init();

        tracing::debug!("Logging initialized (profiling disabled in this build)");
        LoggingGuard
    }
}

pub use inner::{LoggingGuard, setup_logging};
