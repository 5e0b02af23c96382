//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// How the process-wide subscriber is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingOptions {
    /// Fallback directive when `RUST_LOG` is unset or unparsable.
    pub filter: String,
    /// JSON lines when true, human-readable output otherwise.
    pub json: bool,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self { filter: "info".to_string(), json: true }
    }
}

impl TracingOptions {
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(options: &TracingOptions) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(options.env_filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = if options.json {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };

    ::tracing::debug!(json = options.json, "tracing initialised");
}
