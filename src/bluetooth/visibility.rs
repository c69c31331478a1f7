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

//! Device discoverability control.
//!
//! Discoverability is trusted infrastructure: callers never see a failure,
//! backends only log it.

use serde::{Deserialize, Serialize};
use std::process::Command;
use tracing::{debug, info, warn};

/// Whether the device answers inquiry scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoverabilityState {
    Visible,
    #[default]
    Hidden,
}

impl DiscoverabilityState {
    pub fn from_flag(on: bool) -> Self {
        if on {
            DiscoverabilityState::Visible
        } else {
            DiscoverabilityState::Hidden
        }
    }

    pub fn is_visible(&self) -> bool {
        *self == DiscoverabilityState::Visible
    }
}

/// Trait for discoverability backends.
#[allow(async_fn_in_trait)]
pub trait VisibilityController {
    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Best-effort switch of device discoverability.
    async fn set_visible(&mut self, on: bool);
}

/// Which backend toggles discoverability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityBackend {
    /// `hciconfig <adapter> piscan|noscan`.
    #[default]
    Hciconfig,
    /// BlueZ adapter `Discoverable` property over D-Bus.
    Bluez,
}

/// Discoverability through the `hciconfig` tool.
pub struct HciconfigVisibility {
    adapter: String,
}

impl HciconfigVisibility {
    pub fn new(adapter: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
        }
    }

    /// Arguments for the given state, e.g. `["hci0", "piscan"]`.
    pub fn args(&self, on: bool) -> [&str; 2] {
        [self.adapter.as_str(), if on { "piscan" } else { "noscan" }]
    }
}

impl VisibilityController for HciconfigVisibility {
    fn backend_name(&self) -> &'static str {
        "hciconfig"
    }

    async fn set_visible(&mut self, on: bool) {
        let args = self.args(on);
        debug!("Running: hciconfig {:?}", args);

        match Command::new("hciconfig").args(args).output() {
            Ok(output) if output.status.success() => {
                info!("Adapter {} is now {}", self.adapter, args[1]);
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!("hciconfig {} failed: {}", args[1], stderr.trim());
            }
            Err(e) => warn!("Failed to run hciconfig: {}", e),
        }
    }
}

/// Discoverability through the BlueZ adapter property.
///
/// bluetoothd hides the adapter again once `DiscoverableTimeout` expires
/// (180 s by default). The timeout is cleared to 0 before switching on, so
/// the device stays visible for however long the accept wait takes.
pub struct AdapterVisibility {
    adapter: bluer::Adapter,
}

impl AdapterVisibility {
    pub fn new(adapter: bluer::Adapter) -> Self {
        Self { adapter }
    }

    /// `DiscoverableTimeout` to write before the switch, if any.
    pub fn timeout_for(on: bool) -> Option<u32> {
        on.then_some(0)
    }
}

impl VisibilityController for AdapterVisibility {
    fn backend_name(&self) -> &'static str {
        "bluez"
    }

    async fn set_visible(&mut self, on: bool) {
        if let Some(timeout) = Self::timeout_for(on) {
            if let Err(e) = self.adapter.set_discoverable_timeout(timeout).await {
                warn!("Failed to set discoverable timeout={}: {}", timeout, e);
            }
        }

        match self.adapter.set_discoverable(on).await {
            Ok(()) => info!(
                "Adapter {} discoverable: {}",
                self.adapter.name(),
                on
            ),
            Err(e) => warn!("Failed to set discoverable={}: {}", on, e),
        }
    }
}

/// Backend chosen at startup from configuration.
pub enum Visibility {
    Hciconfig(HciconfigVisibility),
    Adapter(AdapterVisibility),
}

impl VisibilityController for Visibility {
    fn backend_name(&self) -> &'static str {
        match self {
            Visibility::Hciconfig(v) => v.backend_name(),
            Visibility::Adapter(v) => v.backend_name(),
        }
    }

    async fn set_visible(&mut self, on: bool) {
        match self {
            Visibility::Hciconfig(v) => v.set_visible(on).await,
            Visibility::Adapter(v) => v.set_visible(on).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_hidden() {
        assert_eq!(DiscoverabilityState::default(), DiscoverabilityState::Hidden);
        assert!(!DiscoverabilityState::default().is_visible());
    }

    #[test]
    fn test_from_flag() {
        assert!(DiscoverabilityState::from_flag(true).is_visible());
        assert_eq!(
            DiscoverabilityState::from_flag(false),
            DiscoverabilityState::Hidden
        );
    }

    #[test]
    fn test_hciconfig_args() {
        let vis = HciconfigVisibility::new("hci0");
        assert_eq!(vis.args(true), ["hci0", "piscan"]);
        assert_eq!(vis.args(false), ["hci0", "noscan"]);
    }

    #[test]
    fn test_adapter_timeout_cleared_only_when_showing() {
        assert_eq!(AdapterVisibility::timeout_for(true), Some(0));
        assert_eq!(AdapterVisibility::timeout_for(false), None);
    }

    #[test]
    fn test_backend_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            visibility: VisibilityBackend,
        }

        let w: Wrapper = toml::from_str("visibility = \"bluez\"").unwrap();
        assert_eq!(w.visibility, VisibilityBackend::Bluez);
    }
}
