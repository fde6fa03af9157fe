// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection configuration for a single device.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Protocol family spoken by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolFamily {
    /// Legacy JSON protocol (Kasa plugs, bulbs, strips).
    #[default]
    Iot,
    /// Structured protocol with component negotiation (Tapo and newer Kasa).
    Smart,
}

impl ProtocolFamily {
    /// Default port of the family.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Iot => 9999,
            Self::Smart => 80,
        }
    }
}

impl fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iot => f.write_str("IOT"),
            Self::Smart => f.write_str("SMART"),
        }
    }
}

/// Configuration for one device.
///
/// # Examples
///
/// ```
/// use kasalink::{DeviceConfig, ProtocolFamily};
/// use std::time::Duration;
///
/// let config = DeviceConfig::new("192.168.1.100");
/// assert_eq!(config.port(), 9999);
///
/// let config = DeviceConfig::new("192.168.1.101")
///     .with_family(ProtocolFamily::Smart)
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.port(), 80);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(default = "default_timeout", with = "millis")]
    timeout: Duration,
    #[serde(default)]
    family: ProtocolFamily,
}

fn default_timeout() -> Duration {
    DeviceConfig::DEFAULT_TIMEOUT
}

impl DeviceConfig {
    /// Default round-trip timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration for the specified host.
    ///
    /// # Arguments
    ///
    /// * `host` - The hostname or IP address of the device
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            timeout: Self::DEFAULT_TIMEOUT,
            family: ProtocolFamily::default(),
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the round-trip timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the protocol family.
    #[must_use]
    pub fn with_family(mut self, family: ProtocolFamily) -> Self {
        self.family = family;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port, falling back to the family default.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.family.default_port())
    }

    /// Returns the round-trip timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the protocol family.
    #[must_use]
    pub fn family(&self) -> ProtocolFamily {
        self.family
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_follow_family() {
        assert_eq!(DeviceConfig::new("h").port(), 9999);
        assert_eq!(
            DeviceConfig::new("h").with_family(ProtocolFamily::Smart).port(),
            80
        );
        assert_eq!(DeviceConfig::new("h").with_port(10000).port(), 10000);
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: DeviceConfig =
            serde_json::from_str(r#"{"host": "10.0.0.2", "family": "smart"}"#).unwrap();
        assert_eq!(config.host(), "10.0.0.2");
        assert_eq!(config.family(), ProtocolFamily::Smart);
        assert_eq!(config.timeout(), DeviceConfig::DEFAULT_TIMEOUT);
    }

    #[test]
    fn timeout_serialized_as_millis() {
        let config = DeviceConfig::new("h").with_timeout(Duration::from_millis(2500));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["timeout"], 2500);
        assert_eq!(json["family"], "iot");
    }
}
