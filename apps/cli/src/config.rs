// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Importer configuration loaded from environment variables.

use bimjson_host::DEFAULT_MIN_LENGTH_MM;
use std::time::Duration;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Importer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long to wait for the host thread to answer a request.
    pub request_timeout_secs: u64,
    /// Log output format.
    pub log_format: LogFormat,
    /// Segments shorter than this are skipped.
    pub min_wall_length_mm: f64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            request_timeout_secs: lookup("BIMJSON_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(30),
            log_format: lookup("BIMJSON_LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(LogFormat::Pretty),
            min_wall_length_mm: lookup("BIMJSON_MIN_WALL_LENGTH_MM")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(DEFAULT_MIN_LENGTH_MM),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
