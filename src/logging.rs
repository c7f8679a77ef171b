//! Tracing setup for the `gps-bridge` binary.
//!
//! Everything goes to stderr; stdout belongs to the NMEA stream.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `override_level` (from the command
/// line) or the configured level is used. Calling this twice is harmless;
/// the second subscriber is discarded.
pub fn init(config: &LoggingConfig, override_level: Option<&str>) {
    let filter = build_filter(config, override_level);

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

fn build_filter(config: &LoggingConfig, override_level: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = override_level.unwrap_or(&config.level);
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    #[serial]
    fn test_override_level_wins_over_config() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig::default();

        let filter = build_filter(&config, Some("debug"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = build_filter(&config, None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    #[serial]
    fn test_garbage_level_falls_back_to_info() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "=[not a directive".to_string(),
            ..LoggingConfig::default()
        };
        let filter = build_filter(&config, None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_init_twice() {
        let config = LoggingConfig::default();
        init(&config, None);
        init(&config, Some("trace"));
    }
}
