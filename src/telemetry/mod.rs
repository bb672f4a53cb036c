//! Logging subscriber setup
//!
//! Builds a layered subscriber:
//!
//! ```text
//! Registry
//!   ├── EnvFilter (RUST_LOG, falling back to the requested level)
//!   └── Fmt Layer (pretty or JSON console output)
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Subscriber initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to set global subscriber (may already be initialized): {0}")]
    AlreadyInitialized(String),
}

/// Map a level name to a [`Level`], defaulting to INFO
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()))
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_subscriber(level: &str, json: bool) -> Result<(), TelemetryError> {
    let filter = env_filter(parse_level(level));

    let result = if json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(filter).with(fmt_layer),
        )
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(filter).with(fmt_layer),
        )
    };

    result.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_second_init_fails() {
        // Either this call or another test's installed the global subscriber.
        let _ = init_subscriber("info", false);
        assert!(matches!(
            init_subscriber("info", true),
            Err(TelemetryError::AlreadyInitialized(_))
        ));
    }
}
