// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Motion sensor.

use std::sync::Arc;

use super::{MOTION, field};
use crate::device::DeviceHandle;
use crate::error::Result;
use crate::feature::{Category, Feature, FeatureMap, FeatureType, add_feature};
use crate::module::{Module, ModuleBase};
use crate::types::FeatureValue;

/// Motion detection state.
///
/// Sensors expose no dedicated component for this; the module is admitted
/// when the device info block carries a `detected` key.
#[derive(Debug)]
pub struct MotionSensor {
    base: ModuleBase,
}

impl MotionSensor {
    /// Creates the module.
    #[must_use]
    pub fn new(device: DeviceHandle) -> Self {
        Self {
            base: ModuleBase::new(MOTION, device),
        }
    }

    /// Returns `true` while motion is detected.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn motion_detected(&self) -> Result<bool> {
        self.base.with_info(|info| field(info, "detected"))?
    }
}

impl Module for MotionSensor {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        add_feature(
            features,
            Feature::builder(&self, "motion_detected", "Motion detected")
                .kind(FeatureType::BinarySensor)
                .category(Category::Primary)
                .icon("mdi:motion-sensor")
                .getter(|m: &Self| Ok(m.motion_detected()?.into()))
                .build(),
        )
    }

    fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
        (name == "motion_detected").then(|| self.motion_detected().map(Into::into))
    }
}
