// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values Figment cannot
//! check structurally.

use crate::model::CourierConfig;

/// A single human-readable validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending key, e.g. `service.log_level`.
    pub key: String,
    /// What is wrong and what would be accepted.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized config, collecting every failure rather than
/// stopping at the first.
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ValidationError {
            key: "service.log_level".into(),
            message: format!(
                "unknown level {:?}, expected one of {}",
                config.service.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.service.origin.trim().is_empty() {
        errors.push(ValidationError {
            key: "service.origin".into(),
            message: "must not be empty".into(),
        });
    }

    if !config.transport.bridge_url.starts_with("http://")
        && !config.transport.bridge_url.starts_with("https://")
    {
        errors.push(ValidationError {
            key: "transport.bridge_url".into(),
            message: format!(
                "expected an http(s) URL, got {:?}",
                config.transport.bridge_url
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ValidationError {
            key: "storage.database_path".into(),
            message: "must not be empty".into(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
