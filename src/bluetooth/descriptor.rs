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

//! Service descriptor and SDP record rendering.

use std::collections::BTreeSet;
use std::fmt::Write;
use uuid::Uuid;

use crate::error::{Result, SessionError};

/// Standard SPP UUID.
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// Symbolic name for the serial port class and profile.
pub const SERIAL_PORT: &str = "serial-port";

/// Default service name.
pub const DEFAULT_SERVICE_NAME: &str = "RaspiBtSrv";

/// 16-bit SDP short ids.
const SERIAL_PORT_SHORT: u16 = 0x1101;
const L2CAP_SHORT: u16 = 0x0100;
const RFCOMM_SHORT: u16 = 0x0003;
const PUBLIC_BROWSE_GROUP_SHORT: u16 = 0x1002;

/// Profile version advertised in the profile descriptor list (1.2).
const PROFILE_VERSION: u16 = 0x0102;

/// Immutable description of the offered service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub uuid: String,
    pub service_classes: BTreeSet<String>,
    pub profile: String,
    pub friendly_name: String,
}

impl ServiceDescriptor {
    pub fn new(
        uuid: impl Into<String>,
        service_classes: impl IntoIterator<Item = String>,
        profile: impl Into<String>,
        friendly_name: impl Into<String>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            service_classes: service_classes.into_iter().collect(),
            profile: profile.into(),
            friendly_name: friendly_name.into(),
        }
    }

    /// The serial port service record published by the pairing front-end.
    pub fn serial_port(friendly_name: impl Into<String>) -> Self {
        let uuid = SPP_UUID.to_string().to_uppercase();
        Self::new(
            uuid.clone(),
            [uuid, SERIAL_PORT.to_string()],
            SERIAL_PORT,
            friendly_name,
        )
    }

    /// Parse the service UUID.
    pub fn service_uuid(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.uuid)
            .map_err(|e| SessionError::Advertisement(format!("invalid uuid '{}': {}", self.uuid, e)))
    }

    /// Resolve every service class to a record value.
    fn class_values(&self) -> Result<Vec<String>> {
        self.service_classes.iter().map(|c| resolve_identifier(c)).collect()
    }

    /// Render the descriptor as a BlueZ SDP record bound to `channel`.
    pub fn sdp_record(&self, channel: u8) -> Result<String> {
        let service_id = self.service_uuid()?;
        let classes = self.class_values()?;
        let profile = resolve_identifier(&self.profile)?;

        if self.friendly_name.is_empty() {
            return Err(SessionError::Advertisement("empty service name".into()));
        }
        if channel == 0 {
            return Err(SessionError::Advertisement(
                "endpoint has no assigned channel".into(),
            ));
        }

        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<record>\n");

        // ServiceClassIDList: the service uuid first, then the remaining classes.
        xml.push_str("  <attribute id=\"0x0001\">\n    <sequence>\n");
        let _ = writeln!(xml, "      <uuid value=\"{}\" />", service_id);
        for value in classes.iter().filter(|v| **v != service_id.to_string()) {
            let _ = writeln!(xml, "      <uuid value=\"{}\" />", value);
        }
        xml.push_str("    </sequence>\n  </attribute>\n");

        // ServiceID
        let _ = writeln!(
            xml,
            "  <attribute id=\"0x0003\">\n    <uuid value=\"{}\" />\n  </attribute>",
            service_id
        );

        // ProtocolDescriptorList: L2CAP, RFCOMM on our channel.
        let _ = writeln!(
            xml,
            "  <attribute id=\"0x0004\">\n    <sequence>\n      <sequence>\n        <uuid value=\"0x{:04x}\" />\n      </sequence>\n      <sequence>\n        <uuid value=\"0x{:04x}\" />\n        <uint8 value=\"0x{:02x}\" />\n      </sequence>\n    </sequence>\n  </attribute>",
            L2CAP_SHORT, RFCOMM_SHORT, channel
        );

        // BrowseGroupList
        let _ = writeln!(
            xml,
            "  <attribute id=\"0x0005\">\n    <sequence>\n      <uuid value=\"0x{:04x}\" />\n    </sequence>\n  </attribute>",
            PUBLIC_BROWSE_GROUP_SHORT
        );

        // BluetoothProfileDescriptorList
        let _ = writeln!(
            xml,
            "  <attribute id=\"0x0009\">\n    <sequence>\n      <sequence>\n        <uuid value=\"{}\" />\n        <uint16 value=\"0x{:04x}\" />\n      </sequence>\n    </sequence>\n  </attribute>",
            profile, PROFILE_VERSION
        );

        // ServiceName
        let _ = writeln!(
            xml,
            "  <attribute id=\"0x0100\">\n    <text value=\"{}\" />\n  </attribute>",
            escape_xml(&self.friendly_name)
        );

        xml.push_str("</record>\n");
        Ok(xml)
    }
}

impl Default for ServiceDescriptor {
    fn default() -> Self {
        Self::serial_port(DEFAULT_SERVICE_NAME)
    }
}

/// Map a symbolic class/profile name or a UUID string to an SDP uuid value.
fn resolve_identifier(identifier: &str) -> Result<String> {
    match identifier {
        SERIAL_PORT => Ok(format!("0x{:04x}", SERIAL_PORT_SHORT)),
        other => Uuid::parse_str(other)
            .map(|u| u.to_string())
            .map_err(|_| {
                SessionError::Advertisement(format!("unknown service identifier '{}'", other))
            }),
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
