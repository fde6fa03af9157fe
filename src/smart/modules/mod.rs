// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Modules of structured devices.
//!
//! Most light and fan parameters live in the device info block, so the
//! corresponding modules add nothing to the refresh request and read
//! [`ModuleBase::with_info`](crate::module::ModuleBase::with_info) instead.

mod alarm;
mod brightness;
mod color;
mod color_temperature;
mod device;
mod energy;
mod fan;
mod led;
mod light;
mod motion;

pub use alarm::{ALARM_VOLUMES, Alarm};
pub use brightness::Brightness;
pub use color::Color;
pub use color_temperature::{ColorTemperature, DEFAULT_TEMPERATURE_RANGE};
pub use device::DeviceModule;
pub use energy::SmartEnergy;
pub use fan::{Fan, MAX_FAN_SPEED};
pub use led::SmartLed;
pub use light::SmartLight;
pub use motion::MotionSensor;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::device::DeviceHandle;
use crate::error::{ParseError, Result};

/// Name of the device module.
pub const DEVICE: &str = "device";
/// Name of the energy module.
pub const ENERGY: &str = "energy";
/// Name of the brightness module.
pub const BRIGHTNESS: &str = "brightness";
/// Name of the white temperature module.
pub const COLOR_TEMPERATURE: &str = "color_temperature";
/// Name of the color module.
pub const COLOR: &str = "color";
/// Name of the composite light module.
pub const LIGHT: &str = "light";
/// Name of the motion sensor module.
pub const MOTION: &str = "motion";
/// Name of the fan module.
pub const FAN: &str = "fan";
/// Name of the alarm module.
pub const ALARM: &str = "alarm";
/// Name of the status LED module.
pub const LED: &str = "led";

/// Reads and converts one field of a JSON object.
fn field<T: DeserializeOwned>(value: &Value, key: &str) -> Result<T> {
    let raw = value
        .get(key)
        .ok_or_else(|| ParseError::MissingField(key.to_string()))?;
    T::deserialize(raw).map_err(|e| {
        ParseError::InvalidValue {
            field: key.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

async fn set_device_info(device: &DeviceHandle, params: Value) -> Result<Value> {
    super::call(device, "set_device_info", params).await
}
