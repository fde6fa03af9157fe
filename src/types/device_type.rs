// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identity types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of physical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceType {
    /// Smart plug.
    Plug,
    /// Power strip with individually switchable sockets.
    Strip,
    /// Light bulb.
    Bulb,
    /// Addressable light strip.
    LightStrip,
    /// Wall switch.
    WallSwitch,
    /// Wall dimmer.
    Dimmer,
    /// Battery-powered sensor.
    Sensor,
    /// Hub for sub-devices.
    Hub,
    /// Ceiling or standalone fan.
    Fan,
    /// Not recognized.
    #[default]
    Unknown,
}

impl DeviceType {
    /// Returns `true` for bulbs and light strips.
    #[must_use]
    pub const fn is_light(self) -> bool {
        matches!(self, Self::Bulb | Self::LightStrip)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plug => "Plug",
            Self::Strip => "Strip",
            Self::Bulb => "Bulb",
            Self::LightStrip => "LightStrip",
            Self::WallSwitch => "WallSwitch",
            Self::Dimmer => "Dimmer",
            Self::Sensor => "Sensor",
            Self::Hub => "Hub",
            Self::Fan => "Fan",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Read-only identity of a device, taken from its info block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Kind of device.
    pub device_type: DeviceType,
    /// Model string, e.g. `HS110(EU)`.
    pub model: String,
    /// User-assigned name.
    pub alias: Option<String>,
    /// Stable device identifier.
    pub device_id: Option<String>,
    /// MAC address.
    pub mac: Option<String>,
    /// Firmware version string.
    pub firmware: Option<String>,
}
