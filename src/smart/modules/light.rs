// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Composite light of structured devices.
//!
//! Brightness, color and white temperature are separate modules on
//! structured devices. [`SmartLight`] presents them through the common
//! [`Light`] interface and assembles the combined [`LightState`] after
//! every refresh.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::{Brightness, Color, ColorTemperature, LIGHT, field, set_device_info};
use crate::device::DeviceHandle;
use crate::error::{DeviceError, Result};
use crate::interfaces::{Light, check_state, light_attribute};
use crate::module::{Module, ModuleBase, ModuleSet};
use crate::smart::Components;
use crate::types::{ColorTempRange, FeatureValue, Hsv, LightState};

/// Light interface over the brightness, color and temperature modules.
#[derive(Debug)]
pub struct SmartLight {
    base: ModuleBase,
    effects: bool,
    state: RwLock<Option<LightState>>,
}

impl SmartLight {
    /// Creates the module for a device with the given components.
    #[must_use]
    pub fn new(device: DeviceHandle, components: &Components) -> Self {
        Self {
            base: ModuleBase::new(LIGHT, device),
            effects: components.contains("light_effect")
                || components.contains("light_strip_lighting_effect"),
            state: RwLock::new(None),
        }
    }

    fn current_state(&self, modules: &ModuleSet) -> Result<LightState> {
        let is_on = self.base.with_info(|info| field::<bool>(info, "device_on"))??;
        let mut state = LightState::default().with_on(is_on);
        if is_on {
            if let Some(brightness) = modules.get::<Brightness>() {
                state.brightness = Some(brightness.brightness()?);
            }
            if let Some(color) = modules.get::<Color>() {
                let hsv = color.hsv()?;
                state.hue = Some(hsv.hue());
                state.saturation = Some(hsv.saturation());
            }
            if let Some(temperature) = modules.get::<ColorTemperature>() {
                state.color_temp = Some(temperature.color_temp()?);
            }
        }
        Ok(state)
    }

    fn sibling<M: Module>(&self, capability: &str) -> Result<Arc<M>> {
        self.base
            .device()
            .module::<M>()
            .ok_or_else(|| DeviceError::unsupported(capability).into())
    }
}

impl Module for SmartLight {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn post_update(&self, modules: &ModuleSet) -> Result<()> {
        let computed = self.current_state(modules);
        *self.state.write() = computed.as_ref().ok().cloned();
        computed.map(drop)
    }

    fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
        light_attribute(self, name)
    }

    fn as_light(self: Arc<Self>) -> Option<Arc<dyn Light>> {
        Some(self)
    }
}

#[async_trait]
impl Light for SmartLight {
    fn is_dimmable(&self) -> bool {
        self.base.device().module::<Brightness>().is_some()
    }

    fn is_color(&self) -> bool {
        self.base.device().module::<Color>().is_some()
    }

    fn is_variable_color_temp(&self) -> bool {
        self.base.device().module::<ColorTemperature>().is_some()
    }

    fn has_effects(&self) -> bool {
        self.effects
    }

    fn brightness(&self) -> Result<u8> {
        self.sibling::<Brightness>("brightness")?.brightness()
    }

    fn hsv(&self) -> Result<Hsv> {
        self.sibling::<Color>("color")?.hsv()
    }

    fn color_temp(&self) -> Result<u16> {
        self.sibling::<ColorTemperature>("color temperature")?
            .color_temp()
    }

    fn valid_temperature_range(&self) -> Result<ColorTempRange> {
        self.sibling::<ColorTemperature>("color temperature")?
            .valid_temperature_range()
    }

    fn state(&self) -> Result<LightState> {
        self.state
            .read()
            .clone()
            .ok_or_else(|| DeviceError::update_required(LIGHT).into())
    }

    async fn set_brightness(&self, brightness: i64, transition: Option<u32>) -> Result<Value> {
        self.sibling::<Brightness>("brightness")?
            .set_brightness(brightness, transition)
            .await
    }

    async fn set_hsv(&self, hsv: Hsv, transition: Option<u32>) -> Result<Value> {
        self.sibling::<Color>("color")?.set_hsv(hsv, transition).await
    }

    async fn set_color_temp(&self, kelvin: i64, transition: Option<u32>) -> Result<Value> {
        self.sibling::<ColorTemperature>("color temperature")?
            .set_color_temp(kelvin, transition)
            .await
    }

    async fn set_state(&self, state: &LightState) -> Result<Value> {
        check_state(self, state)?;
        let mut params = Map::new();
        let mut on = state.light_on.unwrap_or(true);
        match state.brightness {
            Some(0) => on = false,
            Some(brightness) => {
                params.insert("brightness".into(), brightness.into());
            }
            None => {}
        }
        if let Some(hue) = state.hue {
            params.insert("hue".into(), hue.into());
        }
        if let Some(saturation) = state.saturation {
            params.insert("saturation".into(), saturation.into());
        }
        if let Some(color_temp) = state.color_temp {
            params.insert("color_temp".into(), color_temp.into());
        }
        if let Some(transition) = state.transition {
            params.insert("transition".into(), transition.into());
        }
        params.insert("device_on".into(), on.into());
        set_device_info(self.base.device(), Value::Object(params)).await
    }
}
