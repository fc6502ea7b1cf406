//! Session configuration

use crate::error::DetourError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing configuration for a [`crate::session::DetourSession`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetourConfig {
    /// Delay between entering `Idle` and starting the lookup
    pub lookup_debounce_ms: u64,
    /// Give up on a lookup after this long; unbounded when unset
    pub lookup_timeout_ms: Option<u64>,
}

impl DetourConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With lookup debounce
    #[inline]
    #[must_use]
    pub fn with_lookup_debounce(mut self, debounce: Duration) -> Self {
        self.lookup_debounce_ms = duration_ms(debounce);
        self
    }

    /// With lookup timeout
    #[inline]
    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout_ms = Some(duration_ms(timeout));
        self
    }

    /// Debounce as a `Duration`
    #[inline]
    #[must_use]
    pub fn lookup_debounce(&self) -> Duration {
        Duration::from_millis(self.lookup_debounce_ms)
    }

    /// Lookup timeout as a `Duration`, if any
    #[inline]
    #[must_use]
    pub fn lookup_timeout(&self) -> Option<Duration> {
        self.lookup_timeout_ms.map(Duration::from_millis)
    }

    /// Parse a TOML document
    ///
    /// # Errors
    /// `DetourError::Config` if the document is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self, DetourError> {
        toml::from_str(text).map_err(|err| DetourError::Config(err.to_string()))
    }
}

impl Default for DetourConfig {
    fn default() -> Self {
        Self {
            lookup_debounce_ms: 100,
            lookup_timeout_ms: None,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
