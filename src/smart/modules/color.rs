// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color of structured lights.

use std::sync::Arc;

use serde_json::{Value, json};

use super::{COLOR, field, set_device_info};
use crate::device::DeviceHandle;
use crate::error::Result;
use crate::feature::{Category, Feature, FeatureMap, add_feature};
use crate::module::{Module, ModuleBase};
use crate::types::{FeatureValue, Hsv};

/// Hue and saturation, with the brightness as value.
#[derive(Debug)]
pub struct Color {
    base: ModuleBase,
}

impl Color {
    /// Creates the module.
    #[must_use]
    pub fn new(device: DeviceHandle) -> Self {
        Self {
            base: ModuleBase::new(COLOR, device),
        }
    }

    /// Returns the current color.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh, or
    /// `ParseError` if a component is missing.
    pub fn hsv(&self) -> Result<Hsv> {
        let (hue, saturation, value) = self.base.with_info(|info| {
            Ok::<_, crate::Error>((
                field(info, "hue")?,
                field(info, "saturation")?,
                field(info, "brightness")?,
            ))
        })??;
        Ok(Hsv::new(hue, saturation, value)?)
    }

    /// Sets the color. Switches from white temperature to color mode.
    ///
    /// # Errors
    ///
    /// Returns the transport error or `DeviceError::CommandRejected`.
    pub async fn set_hsv(&self, hsv: Hsv, transition: Option<u32>) -> Result<Value> {
        let mut params = json!({
            "hue": hsv.hue(),
            "saturation": hsv.saturation(),
            "brightness": hsv.value(),
            "color_temp": 0,
        });
        if let Some(transition) = transition {
            params["transition"] = json!(transition);
        }
        set_device_info(self.base.device(), params).await
    }
}

impl Module for Color {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        add_feature(
            features,
            Feature::builder(&self, "hsv", "HSV")
                .category(Category::Primary)
                .getter(|m: &Self| Ok(m.hsv()?.into()))
                .setter(|m: Arc<Self>, value| async move {
                    m.set_hsv(Hsv::try_from(value)?, None).await
                })
                .build(),
        )
    }

    fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
        (name == "hsv").then(|| self.hsv().map(Into::into))
    }
}
