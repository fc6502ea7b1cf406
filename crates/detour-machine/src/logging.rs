//! Structured logging setup
//!
//! Library code only emits `tracing` events. Binaries call [`init_logging`]
//! once to install a subscriber.
//!
//! # Environment Variables
//!
//! - `DETOUR_LOG_LEVEL`: log level or filter directive (trace|debug|info|warn|error)
//! - `DETOUR_LOG_FORMAT`: compact|pretty|json
//! - `RUST_LOG`: standard `tracing-subscriber` filter, takes precedence over
//!   the level
//!
//! ```bash
//! # Follow every transition, but only warnings from the session driver
//! RUST_LOG="detour_machine::machine=debug,detour_machine::session=warn" detour-replay ...
//! ```

use crate::error::DetourError;
use std::str::FromStr;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact single-line format
    Compact,
    /// Pretty multi-line format with colors
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = DetourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(DetourError::Config(format!("unknown log format: {other}"))),
        }
    }
}

impl LogFormat {
    /// All valid format names
    #[must_use]
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

/// Install the global tracing subscriber
///
/// `level` falls back to `DETOUR_LOG_LEVEL`, then `info`; `format` falls
/// back to `DETOUR_LOG_FORMAT`, then `compact`.
///
/// # Errors
/// `DetourError::Config` for an unknown format or when a global subscriber
/// is already installed.
pub fn init_logging(level: Option<&str>, format: Option<&str>) -> Result<(), DetourError> {
    let log_level = level
        .map(ToString::to_string)
        .or_else(|| std::env::var("DETOUR_LOG_LEVEL").ok())
        .unwrap_or_else(|| "info".to_string());

    let log_format = format
        .map(ToString::to_string)
        .or_else(|| std::env::var("DETOUR_LOG_FORMAT").ok())
        .unwrap_or_else(|| "compact".to_string());

    let filter = if log_level == "off" {
        EnvFilter::new("off")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = Registry::default().with(filter);
    let installed = match LogFormat::from_str(&log_format)? {
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::ACTIVE)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|err| DetourError::Config(format!("logging already initialized: {err}")))
}
