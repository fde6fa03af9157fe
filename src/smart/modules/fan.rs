// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fan speed and sleep mode.

use std::sync::Arc;

use serde_json::{Value, json};

use super::{FAN, field, set_device_info};
use crate::device::DeviceHandle;
use crate::error::{Result, ValueError};
use crate::feature::{Category, Feature, FeatureMap, FeatureType, add_feature};
use crate::module::{Module, ModuleBase};
use crate::types::FeatureValue;

/// Highest fan speed level.
pub const MAX_FAN_SPEED: i64 = 4;

/// Fan control of ceiling fans and fan switches.
#[derive(Debug)]
pub struct Fan {
    base: ModuleBase,
}

impl Fan {
    /// Creates the module.
    #[must_use]
    pub fn new(device: DeviceHandle) -> Self {
        Self {
            base: ModuleBase::new(FAN, device),
        }
    }

    /// Returns the speed level, zero when the device is off.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn fan_speed_level(&self) -> Result<i64> {
        self.base.with_info(|info| {
            if info.get("device_on").and_then(Value::as_bool) == Some(false) {
                return Ok(0);
            }
            field(info, "fan_speed_level")
        })?
    }

    /// Sets the speed level. Zero switches the fan off.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` outside `0..=4`, or the transport
    /// error.
    pub async fn set_fan_speed_level(&self, level: i64) -> Result<Value> {
        if !(0..=MAX_FAN_SPEED).contains(&level) {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: MAX_FAN_SPEED,
                actual: level,
            }
            .into());
        }
        let params = if level == 0 {
            json!({"device_on": false})
        } else {
            json!({"device_on": true, "fan_speed_level": level})
        };
        set_device_info(self.base.device(), params).await
    }

    /// Returns whether sleep mode is enabled.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn sleep_mode(&self) -> Result<bool> {
        self.base.with_info(|info| field(info, "fan_sleep_mode_on"))?
    }

    /// Enables or disables sleep mode.
    ///
    /// # Errors
    ///
    /// Returns the transport error or `DeviceError::CommandRejected`.
    pub async fn set_sleep_mode(&self, on: bool) -> Result<Value> {
        set_device_info(self.base.device(), json!({ "fan_sleep_mode_on": on })).await
    }
}

impl Module for Fan {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        add_feature(
            features,
            Feature::builder(&self, "fan_speed_level", "Fan speed level")
                .kind(FeatureType::Number)
                .category(Category::Primary)
                .icon("mdi:fan")
                .fixed_range(0, MAX_FAN_SPEED)
                .getter(|m: &Self| Ok(m.fan_speed_level()?.into()))
                .setter(|m: Arc<Self>, value| async move {
                    m.set_fan_speed_level(i64::try_from(value)?).await
                })
                .build(),
        )?;
        add_feature(
            features,
            Feature::builder(&self, "fan_sleep_mode", "Fan sleep mode")
                .kind(FeatureType::Switch)
                .icon("mdi:sleep")
                .getter(|m: &Self| Ok(m.sleep_mode()?.into()))
                .setter(|m: Arc<Self>, value| async move {
                    m.set_sleep_mode(bool::try_from(value)?).await
                })
                .build(),
        )
    }

    fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
        match name {
            "fan_speed_level" => Some(self.fan_speed_level().map(Into::into)),
            "sleep_mode" => Some(self.sleep_mode().map(Into::into)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn speed_outside_range_is_rejected() {
        let fan = Fan::new(DeviceHandle::detached());
        for level in [-1, 5] {
            assert!(matches!(
                fan.set_fan_speed_level(level).await,
                Err(crate::Error::Value(ValueError::OutOfRange { actual, .. })) if actual == level
            ));
        }
    }
}
