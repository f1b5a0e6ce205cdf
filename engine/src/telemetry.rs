//! Logging setup for the agent
//!
//! Everything goes to stderr so stdout only ever carries answers and JSON
//! reports. `RUST_LOG` wins over the configured level.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose events follow the configured level
const AGENT_TARGETS: &[&str] = &["lagent", "lagent_engine", "sdk"];

/// HTTP plumbing stays at warn unless `RUST_LOG` says otherwise
const QUIET_TARGETS: &[&str] = &["hyper", "reqwest", "h2", "rustls"];

/// How log lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty in debug builds, JSON in release builds
    #[default]
    Auto,
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    /// Settle `Auto` for the current build
    pub fn resolve(self) -> Self {
        match self {
            LogFormat::Auto if cfg!(debug_assertions) => LogFormat::Pretty,
            LogFormat::Auto => LogFormat::Json,
            other => other,
        }
    }
}

/// Filter directives for a configured level
///
/// Unknown levels fall back to `warn`.
pub fn filter_directives(log_level: &str) -> String {
    let level = log_level.trim().to_ascii_lowercase();
    let level = match level.as_str() {
        "error" | "warn" | "info" | "debug" | "trace" | "off" => level,
        _ => "warn".to_string(),
    };

    let mut directives = vec![level.clone()];
    directives.extend(AGENT_TARGETS.iter().map(|t| format!("{}={}", t, level)));
    if !matches!(level.as_str(), "error" | "warn" | "off") {
        directives.extend(QUIET_TARGETS.iter().map(|t| format!("{}=warn", t)));
    }
    directives.join(",")
}

/// Install the global subscriber
///
/// A second call is a no-op, which keeps tests that share a process happy.
pub fn init_telemetry_with(log_level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(log_level)));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format.resolve() {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty | LogFormat::Auto => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Subscriber already installed");
    }
}

/// Install the subscriber with the build's default format
pub fn init_telemetry_with_level(log_level: &str) {
    init_telemetry_with(log_level, LogFormat::Auto);
}

/// Warn-level logging for when no config could be read
pub fn init_telemetry() {
    init_telemetry_with_level("warn");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_covers_agent_crates() {
        let filter = filter_directives("info");
        assert!(filter.starts_with("info,"));
        assert!(filter.contains("lagent_engine=info"));
        assert!(filter.contains("sdk=info"));
        assert!(filter.contains("reqwest=warn"));
    }

    #[test]
    fn test_filter_quiet_levels_skip_http_overrides() {
        let filter = filter_directives("warn");
        assert!(!filter.contains("hyper"));
        assert_eq!(filter_directives("ERROR"), filter_directives("error"));
    }

    #[test]
    fn test_unknown_level_falls_back_to_warn() {
        assert_eq!(filter_directives("chatty"), filter_directives("warn"));
        // Every directive must be accepted by tracing-subscriber
        assert!(EnvFilter::try_new(filter_directives("debug")).is_ok());
    }

    #[test]
    fn test_log_format_from_config() {
        let format: LogFormat = serde_json::from_str("\"compact\"").unwrap();
        assert_eq!(format, LogFormat::Compact);
        assert_eq!(format.resolve(), LogFormat::Compact);
        assert_ne!(LogFormat::Auto.resolve(), LogFormat::Auto);
    }
}
