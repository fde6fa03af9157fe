// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status LED of legacy plugs and switches.

use std::sync::Arc;

use serde_json::{Value, json};

use super::{LED, int};
use crate::device::DeviceHandle;
use crate::error::Result;
use crate::feature::{Feature, FeatureMap, FeatureType, add_feature};
use crate::iot::{self, SYSTEM};
use crate::module::{Module, ModuleBase};
use crate::types::FeatureValue;

/// The status LED, read from the `led_off` sysinfo flag.
#[derive(Debug)]
pub struct Led {
    base: ModuleBase,
}

impl Led {
    /// Creates the module.
    #[must_use]
    pub fn new(device: DeviceHandle) -> Self {
        Self {
            base: ModuleBase::new(LED, device),
        }
    }

    /// Returns whether the LED is enabled.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn led(&self) -> Result<bool> {
        self.base.with_info(|info| int(info, "led_off"))?.map(|off| off == 0)
    }

    /// Enables or disables the LED.
    ///
    /// # Errors
    ///
    /// Returns the transport error or `DeviceError::CommandRejected`.
    pub async fn set_led(&self, enabled: bool) -> Result<Value> {
        let off = i64::from(!enabled);
        iot::call(self.base.device(), SYSTEM, "set_led_off", json!({ "off": off })).await
    }
}

impl Module for Led {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        add_feature(
            features,
            Feature::builder(&self, "led", "LED")
                .kind(FeatureType::Switch)
                .icon("mdi:led")
                .getter(|m: &Self| Ok(m.led()?.into()))
                .setter(|m: Arc<Self>, value| async move { m.set_led(bool::try_from(value)?).await })
                .build(),
        )
    }

    fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
        (name == "led").then(|| self.led().map(Into::into))
    }
}
