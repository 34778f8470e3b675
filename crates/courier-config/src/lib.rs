// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Courier messaging service.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides via the `COURIER_` prefix.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::CourierConfig;
pub use validation::ValidationError;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Figment errors and validation failures are both rendered as a flat list
/// of human-readable messages for the binary to print.
pub fn load_and_validate() -> Result<CourierConfig, Vec<String>> {
    match loader::load_config() {
        Ok(config) => match validation::validate_config(&config) {
            Ok(()) => Ok(config),
            Err(errors) => Err(errors.iter().map(ToString::to_string).collect()),
        },
        Err(err) => Err(err.into_iter().map(|e| e.to_string()).collect()),
    }
}
