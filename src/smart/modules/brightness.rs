// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brightness of structured lights and dimmers.

use std::sync::Arc;

use serde_json::{Value, json};

use super::{BRIGHTNESS, field, set_device_info};
use crate::device::DeviceHandle;
use crate::error::Result;
use crate::feature::{Category, Feature, FeatureMap, FeatureType, add_feature};
use crate::module::{Module, ModuleBase};
use crate::types::{FeatureValue, check_brightness};

/// Brightness in percent, read from the device info block.
#[derive(Debug)]
pub struct Brightness {
    base: ModuleBase,
}

impl Brightness {
    /// Creates the module.
    #[must_use]
    pub fn new(device: DeviceHandle) -> Self {
        Self {
            base: ModuleBase::new(BRIGHTNESS, device),
        }
    }

    /// Returns the brightness in percent.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn brightness(&self) -> Result<u8> {
        self.base.with_info(|info| field(info, "brightness"))?
    }

    /// Sets the brightness in percent. Zero switches the device off.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` outside `0..=100`, or the transport
    /// error.
    pub async fn set_brightness(&self, brightness: i64, transition: Option<u32>) -> Result<Value> {
        let brightness = check_brightness(brightness)?;
        if brightness == 0 {
            return set_device_info(self.base.device(), json!({"device_on": false})).await;
        }
        let mut params = json!({ "brightness": brightness });
        if let Some(transition) = transition {
            params["transition"] = json!(transition);
        }
        set_device_info(self.base.device(), params).await
    }
}

impl Module for Brightness {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        add_feature(
            features,
            Feature::builder(&self, "brightness", "Brightness")
                .unit("%")
                .kind(FeatureType::Number)
                .category(Category::Primary)
                .fixed_range(0, 100)
                .getter(|m: &Self| Ok(m.brightness()?.into()))
                .setter(|m: Arc<Self>, value| async move {
                    m.set_brightness(i64::try_from(value)?, None).await
                })
                .build(),
        )
    }

    fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
        (name == "brightness").then(|| self.brightness().map(Into::into))
    }
}
