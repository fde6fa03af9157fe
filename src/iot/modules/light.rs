// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Legacy light control for bulbs, light strips and wall dimmers.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value, json};

use super::{DIMMER, LIGHT, LIGHT_STRIP, LIGHTING_SERVICE, int, narrow};
use crate::device::DeviceHandle;
use crate::error::{DeviceError, Result};
use crate::family::Family;
use crate::feature::{Category, Feature, FeatureMap, FeatureType, add_feature};
use crate::interfaces::{Light, check_state, light_attribute};
use crate::iot::{self, Iot, IotCapabilities, SYSTEM};
use crate::module::{Module, ModuleBase, ModuleSet};
use crate::types::{
    ColorTempRange, DeviceType, FeatureValue, Hsv, LightState, check_brightness,
};

/// Light of a legacy bulb, light strip or wall dimmer.
///
/// Light parameters live in the device info block, so the module adds
/// nothing to the refresh request.
#[derive(Debug)]
pub struct IotLight {
    base: ModuleBase,
    device_type: DeviceType,
    dimmable: bool,
    color: bool,
    variable_color_temp: bool,
    effects: bool,
    temperature_range: ColorTempRange,
    state: RwLock<Option<LightState>>,
}

impl IotLight {
    /// Creates the light for a device with the given capabilities.
    #[must_use]
    pub fn new(device: DeviceHandle, capabilities: &IotCapabilities) -> Self {
        Self {
            base: ModuleBase::new(LIGHT, device),
            device_type: capabilities.device_type,
            dimmable: capabilities.is_dimmable,
            color: capabilities.is_color,
            variable_color_temp: capabilities.is_variable_color_temp,
            effects: capabilities.has_effects,
            temperature_range: capabilities.temperature_range(),
            state: RwLock::new(None),
        }
    }

    fn is_bulb(&self) -> bool {
        self.device_type.is_light()
    }

    /// Returns the active light parameters.
    ///
    /// A switched-off bulb reports the parameters it will turn on with.
    fn light_info(&self) -> Result<Value> {
        let is_bulb = self.is_bulb();
        self.base.with_info(|info| {
            if !is_bulb {
                return info.clone();
            }
            let light = &info["light_state"];
            match light.get("dft_on_state") {
                Some(default) if int(light, "on_off").is_ok_and(|on| on == 0) => default.clone(),
                _ => light.clone(),
            }
        })
    }

    fn current_state(&self) -> Result<LightState> {
        let is_on = self.base.with_info(Iot::is_on)?.unwrap_or(false);
        let mut state = LightState::default().with_on(is_on);
        if is_on {
            if self.dimmable {
                state.brightness = Some(self.brightness()?);
            }
            if self.color {
                let hsv = self.hsv()?;
                state.hue = Some(hsv.hue());
                state.saturation = Some(hsv.saturation());
            }
            if self.variable_color_temp {
                state.color_temp = Some(self.color_temp()?);
            }
        }
        Ok(state)
    }

    async fn set_dimmer_state(&self, state: &LightState) -> Result<Value> {
        let device = self.base.device();
        if state.brightness == Some(0) || state.light_on == Some(false) {
            return iot::call(device, SYSTEM, "set_relay_state", json!({"state": 0})).await;
        }
        if let Some(brightness) = state.brightness {
            return iot::call(
                device,
                DIMMER,
                "set_dimmer_transition",
                json!({
                    "brightness": brightness,
                    "duration": state.transition.unwrap_or(0),
                }),
            )
            .await;
        }
        iot::call(device, SYSTEM, "set_relay_state", json!({"state": 1})).await
    }

    async fn set_bulb_state(&self, state: &LightState) -> Result<Value> {
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
            params.insert("transition_period".into(), transition.into());
        }
        params.insert("on_off".into(), i64::from(on).into());
        params.insert("ignore_default".into(), 1.into());

        let (namespace, method) = if self.device_type == DeviceType::LightStrip {
            (LIGHT_STRIP, "set_light_state")
        } else {
            (LIGHTING_SERVICE, "transition_light_state")
        };
        iot::call(self.base.device(), namespace, method, Value::Object(params)).await
    }
}

impl Module for IotLight {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        if self.dimmable {
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
            )?;
        }
        if self.variable_color_temp {
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
            )?;
        }
        if self.color {
            add_feature(
                features,
                Feature::builder(&self, "hsv", "HSV")
                    .kind(FeatureType::Unknown)
                    .category(Category::Primary)
                    .getter(|m: &Self| Ok(m.hsv()?.into()))
                    .setter(|m: Arc<Self>, value| async move {
                        m.set_hsv(Hsv::try_from(value)?, None).await
                    })
                    .build(),
            )?;
        }
        Ok(())
    }

    fn post_update(&self, _modules: &ModuleSet) -> Result<()> {
        // The state of an earlier cycle must not survive a failed rebuild.
        let computed = self.current_state();
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
impl Light for IotLight {
    fn is_dimmable(&self) -> bool {
        self.dimmable
    }

    fn is_color(&self) -> bool {
        self.color
    }

    fn is_variable_color_temp(&self) -> bool {
        self.variable_color_temp
    }

    fn has_effects(&self) -> bool {
        self.effects
    }

    fn brightness(&self) -> Result<u8> {
        if !self.dimmable {
            return Err(DeviceError::unsupported("brightness").into());
        }
        narrow(&self.light_info()?, "brightness")
    }

    fn hsv(&self) -> Result<Hsv> {
        if !self.color {
            return Err(DeviceError::unsupported("color").into());
        }
        let light = self.light_info()?;
        Ok(Hsv::new(
            narrow(&light, "hue")?,
            narrow(&light, "saturation")?,
            narrow(&light, "brightness")?,
        )?)
    }

    fn color_temp(&self) -> Result<u16> {
        if !self.variable_color_temp {
            return Err(DeviceError::unsupported("color temperature").into());
        }
        narrow(&self.light_info()?, "color_temp")
    }

    fn valid_temperature_range(&self) -> Result<ColorTempRange> {
        if !self.variable_color_temp {
            return Err(DeviceError::unsupported("color temperature").into());
        }
        Ok(self.temperature_range)
    }

    fn state(&self) -> Result<LightState> {
        self.state
            .read()
            .clone()
            .ok_or_else(|| DeviceError::update_required(LIGHT).into())
    }

    async fn set_brightness(&self, brightness: i64, transition: Option<u32>) -> Result<Value> {
        if !self.dimmable {
            return Err(DeviceError::unsupported("brightness").into());
        }
        let state = LightState {
            brightness: Some(check_brightness(brightness)?),
            transition,
            ..LightState::default()
        };
        self.set_state(&state).await
    }

    async fn set_hsv(&self, hsv: Hsv, transition: Option<u32>) -> Result<Value> {
        if !self.color {
            return Err(DeviceError::unsupported("color").into());
        }
        let state = LightState {
            light_on: Some(true),
            brightness: Some(hsv.value()),
            hue: Some(hsv.hue()),
            saturation: Some(hsv.saturation()),
            color_temp: Some(0),
            transition,
        };
        self.set_state(&state).await
    }

    async fn set_color_temp(&self, kelvin: i64, transition: Option<u32>) -> Result<Value> {
        let range = self.valid_temperature_range()?;
        let state = LightState {
            light_on: Some(true),
            color_temp: Some(range.check(kelvin)?),
            transition,
            ..LightState::default()
        };
        self.set_state(&state).await
    }

    async fn set_state(&self, state: &LightState) -> Result<Value> {
        check_state(self, state)?;
        if self.is_bulb() {
            self.set_bulb_state(state).await
        } else {
            self.set_dimmer_state(state).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iot::IotCapabilitiesBuilder;

    #[tokio::test]
    async fn unsupported_capabilities_are_reported() {
        let caps = IotCapabilitiesBuilder::new(DeviceType::Bulb)
            .with_dimmer()
            .build();
        let light = IotLight::new(DeviceHandle::detached(), &caps);
        assert!(light.hsv().unwrap_err().is_unsupported());
        assert!(light.color_temp().unwrap_err().is_unsupported());
        assert!(
            light
                .set_hsv(Hsv::new(0, 0, 0).unwrap(), None)
                .await
                .unwrap_err()
                .is_unsupported()
        );
        let colored = LightState {
            hue: Some(10),
            ..LightState::default()
        };
        assert!(light.set_state(&colored).await.unwrap_err().is_unsupported());
    }

    #[tokio::test]
    async fn brightness_is_validated_before_sending() {
        let caps = IotCapabilitiesBuilder::new(DeviceType::Dimmer)
            .with_dimmer()
            .build();
        let light = IotLight::new(DeviceHandle::detached(), &caps);
        assert!(matches!(
            light.set_brightness(101, None).await,
            Err(crate::Error::Value(_))
        ));
    }

    #[test]
    fn state_requires_a_refresh() {
        let caps = IotCapabilitiesBuilder::new(DeviceType::Bulb).build();
        let light = IotLight::new(DeviceHandle::detached(), &caps);
        assert!(matches!(
            light.state(),
            Err(crate::Error::Device(DeviceError::UpdateRequired { .. }))
        ));
    }
}
