//! Logging setup for the demo host
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a single
//! fmt layer on stderr, so stdout stays free for the demo's own output.
//!
//! `RUST_LOG` wins when set and no `-v` flag was given; otherwise the level
//! follows the verbosity count (0 = warn, 1 = info, 2 = debug, 3+ = trace).

use std::io;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum LogFormat {
    /// Compact single-line format
    #[default]
    Compact,
    /// JSON lines, one per event
    Json,
}

impl LogFormat {
    pub(crate) fn parse(name: &str) -> Option<Self> {
        match name {
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub(crate) struct LogConfig {
    pub(crate) level: Level,
    /// Whether `-v` was given; disables the `RUST_LOG` override
    pub(crate) explicit: bool,
    pub(crate) format: LogFormat,
}

impl LogConfig {
    #[must_use]
    pub(crate) fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            explicit: verbosity > 0,
            format: LogFormat::default(),
        }
    }

    #[must_use]
    pub(crate) fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Install the global subscriber
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub(crate) fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let filter = build_env_filter(config);

    match config.format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(io::stderr)
                    .with_target(false)
                    .without_time(),
            )
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(true),
            )
            .try_init()?,
    }
    Ok(())
}

fn build_env_filter(config: &LogConfig) -> EnvFilter {
    let level = config.level.as_str().to_lowercase();
    let fallback = || EnvFilter::new(format!("warn,tabgroup_core={level},tabgroup_demo={level}"));

    if config.explicit {
        return fallback();
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(LogConfig::from_verbosity(0).level, Level::WARN);
        assert_eq!(LogConfig::from_verbosity(2).level, Level::DEBUG);
        assert_eq!(LogConfig::from_verbosity(9).level, Level::TRACE);
        assert!(!LogConfig::from_verbosity(0).explicit);
    }

    #[test]
    fn parses_format_names() {
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), None);
    }
}
