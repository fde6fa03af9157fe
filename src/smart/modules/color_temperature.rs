// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! White temperature of structured lights.

use std::sync::Arc;

use serde_json::{Value, json};

use super::{COLOR_TEMPERATURE, field, set_device_info};
use crate::device::DeviceHandle;
use crate::error::Result;
use crate::feature::{Category, Feature, FeatureMap, FeatureType, add_feature};
use crate::module::{Module, ModuleBase};
use crate::types::{ColorTempRange, FeatureValue};

/// Range assumed when the device does not report one.
pub const DEFAULT_TEMPERATURE_RANGE: ColorTempRange = ColorTempRange::new(2500, 6500);

/// White temperature in Kelvin.
///
/// A temperature of zero means the light is showing a color.
#[derive(Debug)]
pub struct ColorTemperature {
    base: ModuleBase,
}

impl ColorTemperature {
    /// Creates the module.
    #[must_use]
    pub fn new(device: DeviceHandle) -> Self {
        Self {
            base: ModuleBase::new(COLOR_TEMPERATURE, device),
        }
    }

    /// Returns the white temperature in Kelvin.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn color_temp(&self) -> Result<u16> {
        self.base.with_info(|info| field(info, "color_temp"))?
    }

    /// Returns the supported range, from `color_temp_range` when reported.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn valid_temperature_range(&self) -> Result<ColorTempRange> {
        self.base.with_info(|info| {
            field::<[u16; 2]>(info, "color_temp_range")
                .map_or(DEFAULT_TEMPERATURE_RANGE, |[min, max]| {
                    ColorTempRange::new(min, max)
                })
        })
    }

    /// Sets the white temperature in Kelvin.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` outside the supported range, or the
    /// transport error.
    pub async fn set_color_temp(&self, kelvin: i64, transition: Option<u32>) -> Result<Value> {
        let kelvin = self.valid_temperature_range()?.check(kelvin)?;
        let mut params = json!({ "color_temp": kelvin });
        if let Some(transition) = transition {
            params["transition"] = json!(transition);
        }
        set_device_info(self.base.device(), params).await
    }
}

impl Module for ColorTemperature {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        add_feature(
            features,
            Feature::builder(&self, "color_temperature", "Color temperature")
                .unit("K")
                .kind(FeatureType::Number)
                .category(Category::Primary)
                .range(|m: &Self| {
                    let range = m.valid_temperature_range()?;
                    Ok((i64::from(range.min), i64::from(range.max)))
                })
                .getter(|m: &Self| Ok(m.color_temp()?.into()))
                .setter(|m: Arc<Self>, value| async move {
                    m.set_color_temp(i64::try_from(value)?, None).await
                })
                .build(),
        )
    }

    fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
        match name {
            "color_temp" => Some(self.color_temp().map(Into::into)),
            "valid_temperature_range" => Some(self.valid_temperature_range().map(Into::into)),
            _ => None,
        }
    }
}
