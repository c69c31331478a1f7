// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration module.
//!
//! Handles loading the pairing daemon settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bluetooth::{ServiceDescriptor, VisibilityBackend, DEFAULT_SERVICE_NAME, SERIAL_PORT, SPP_UUID};
use crate::handoff::HandoffStrategy;

const APP_DIR: &str = "rfcomm-handoff";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bluetooth settings.
    pub bluetooth: BluetoothConfig,

    /// Published service record.
    pub service: ServiceConfig,

    /// Downstream handoff.
    pub handoff: HandoffStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// HCI adapter name.
    pub adapter: String,

    /// RFCOMM channel; 0 picks the first free one.
    pub channel: u8,

    /// How discoverability is toggled.
    pub visibility: VisibilityBackend,

    /// Wait for the Bluetooth stack before starting, in seconds.
    pub startup_delay_secs: u64,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            adapter: "hci0".to_string(),
            channel: 0,
            visibility: VisibilityBackend::default(),
            startup_delay_secs: 5,
        }
    }
}

impl BluetoothConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service UUID.
    pub uuid: String,

    /// Name shown to remote peers.
    pub name: String,

    /// Service classes: UUIDs or symbolic names such as "serial-port".
    /// Empty means the service UUID plus "serial-port".
    pub service_classes: Vec<String>,

    /// Profile: UUID or symbolic name.
    pub profile: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            uuid: SPP_UUID.to_string().to_uppercase(),
            name: DEFAULT_SERVICE_NAME.to_string(),
            service_classes: Vec::new(),
            profile: SERIAL_PORT.to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn descriptor(&self) -> ServiceDescriptor {
        let classes = if self.service_classes.is_empty() {
            vec![self.uuid.clone(), SERIAL_PORT.to_string()]
        } else {
            self.service_classes.clone()
        };
        ServiceDescriptor::new(self.uuid.clone(), classes, self.profile.clone(), self.name.clone())
    }
}

impl Config {
    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Load configuration from the default path, creating it if missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path` or write the defaults there.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
        } else {
            let config = Self::default();
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(path, content)?;
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_descriptor_matches_serial_port() {
        let config = Config::default();
        assert_eq!(config.service.descriptor(), ServiceDescriptor::default());
        assert_eq!(config.bluetooth.startup_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        // Second load reads back what was written.
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[bluetooth]
channel = 3
visibility = "bluez"

[handoff]
strategy = "file-token"
path = "/run/bt/socket.txt"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.bluetooth.channel, 3);
        assert_eq!(config.bluetooth.adapter, "hci0");
        assert_eq!(config.bluetooth.visibility, VisibilityBackend::Bluez);
        assert_eq!(config.service.name, "RaspiBtSrv");
        assert_eq!(
            config.handoff,
            HandoffStrategy::FileToken {
                path: PathBuf::from("/run/bt/socket.txt"),
                token: "e777".into(),
                consumer: None,
            }
        );
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bluetooth]\nchannel = \"one\"\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
