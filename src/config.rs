// This file is part of Toaster.
//
// Copyright 2024 SECO Mind Srl
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! Device configuration, loaded from a JSON file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::telemetry::Location;

/// Configuration error, fatal at startup.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Couldn't read the configuration file.
    #[error("couldn't read configuration from {}", .path.display())]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Reason why the file couldn't be read.
        #[source]
        backtrace: std::io::Error,
    },
    /// Couldn't parse the configuration file.
    #[error("couldn't parse configuration from {}", .path.display())]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Reason why the file couldn't be parsed.
        #[source]
        backtrace: serde_json::Error,
    },
}

/// Configuration of the simulated appliance.
///
/// Every field has a default matching the bundled `breadToaster` profile, so
/// an empty JSON object is a valid configuration. Credentials are opaque strings, the
/// simulator never interprets them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identity the device registers under.
    pub device_id: String,
    /// Group scope for the registration.
    pub id_scope: String,
    /// Shared key presented to the registry.
    pub primary_key: String,
    /// Registry endpoint to provision against.
    pub endpoint: String,
    /// Seconds between two telemetry emissions.
    pub telemetry_interval_secs: u64,
    /// Base position latitude.
    pub latitude: f64,
    /// Base position longitude.
    pub longitude: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_id: "breadToaster".to_string(),
            id_scope: "your-id-scope".to_string(),
            primary_key: "your-primary-key".to_string(),
            endpoint: "global.device-provisioning.local".to_string(),
            telemetry_interval_secs: 900,
            latitude: 47.6437253,
            longitude: -122.1224279,
        }
    }
}

impl Config {
    /// Reads the configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_owned(),
            backtrace: err,
        })?;

        serde_json::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_owned(),
            backtrace: err,
        })
    }

    /// Delay between two telemetry ticks.
    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_secs(self.telemetry_interval_secs)
    }

    /// Simulated position of the appliance.
    pub fn location(&self) -> Location {
        Location {
            lon: self.longitude,
            lat: self.latitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_the_bread_toaster_profile() {
        let config = Config::default();

        assert_eq!(config.device_id, "breadToaster");
        assert_eq!(config.telemetry_interval(), Duration::from_secs(900));
        assert_eq!(
            config.location(),
            Location {
                lon: -122.1224279,
                lat: 47.6437253,
            }
        );
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "device_id": "toaster-2", "telemetry_interval_secs": 5 }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.device_id, "toaster-2");
        assert_eq!(config.telemetry_interval_secs, 5);
        assert_eq!(config.latitude, 47.6437253);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Config::from_file("/nonexistent/toaster.json").unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
