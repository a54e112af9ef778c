//! Logging and tracing utilities for cubekit
//!
//! Structured logging uses the `tracing` crate. Library code only emits
//! events; the binary calls [`init_with_config`] once at startup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Whether tracing has been initialized
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the stderr subscriber. Only the first call has an effect.
pub fn init_with_config(config: TracingConfig) {
    if TRACING_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_ok()
    {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

        let fmt_layer = fmt::layer()
            .with_target(config.show_target)
            .with_thread_ids(config.show_thread_ids)
            .with_file(config.show_file)
            .with_line_number(config.show_line_number)
            .with_writer(std::io::stderr);

        // A subscriber installed elsewhere (tests, embedding host) wins.
        let _ = tracing_subscriber::registry()
            .with(fmt_layer)
            .with(filter)
            .try_init();
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default log level filter (e.g., "info", "debug", "warn")
    pub default_level: String,
    /// Show the target (module path) in log output
    pub show_target: bool,
    /// Show thread IDs in log output
    pub show_thread_ids: bool,
    /// Show source file in log output
    pub show_file: bool,
    /// Show line number in log output
    pub show_line_number: bool,
}

impl TracingConfig {
    /// Configuration for a `-v` count as used by the command line
    pub fn for_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        Self {
            default_level: format!("warn,cubekit={level}"),
            show_target: verbosity >= 2,
            show_thread_ids: verbosity >= 3,
            show_file: verbosity >= 3,
            show_line_number: verbosity >= 3,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_verbosity(1)
    }
}

/// Run one export stage inside a span and log how long it took
pub fn instrument_stage<T, F>(name: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let span = tracing::info_span!("stage", stage = %name);
    let _guard = span.enter();

    let start = Instant::now();
    let result = f();
    let duration = start.elapsed();

    tracing::debug!(duration_ms = %duration.as_millis(), "Stage complete");

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config_default() {
        let config = TracingConfig::default();
        assert_eq!(config.default_level, "warn,cubekit=info");
        assert!(!config.show_target);
        assert!(!config.show_thread_ids);
    }

    #[test]
    fn test_verbosity_levels() {
        assert!(TracingConfig::for_verbosity(0).default_level.ends_with("warn"));
        assert!(TracingConfig::for_verbosity(2).default_level.ends_with("debug"));
        let loud = TracingConfig::for_verbosity(5);
        assert!(loud.default_level.ends_with("trace"));
        assert!(loud.show_line_number);
    }

    #[test]
    fn test_instrument_stage() {
        let result = instrument_stage("test", || 42);
        assert_eq!(result, 42);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_with_config(TracingConfig::default());
        init_with_config(TracingConfig::for_verbosity(3));
    }
}
