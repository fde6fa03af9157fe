// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Built-in effects of legacy light strips.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{LIGHT_EFFECT, LIGHT_STRIP, int};
use crate::device::DeviceHandle;
use crate::error::{ParseError, Result};
use crate::feature::FeatureMap;
use crate::interfaces::{LIGHT_EFFECTS_OFF, LightEffect, initialize_light_effect_features};
use crate::iot;
use crate::module::{Module, ModuleBase};
use crate::types::FeatureValue;

/// Effects shipped with the light strip firmware.
pub const EFFECT_NAMES: &[&str] = &[
    "Aurora",
    "Bubbling Cauldron",
    "Candy Cane",
    "Christmas",
    "Flicker",
    "Grandma's Christmas Lights",
    "Hanukkah",
    "Haunted Mansion",
    "Icicle",
    "Lightning",
    "Ocean",
    "Rainbow",
    "Raindrop",
    "Spring",
    "Sunrise",
    "Sunset",
    "Valentines",
];

/// Effect control of a legacy light strip.
///
/// The running effect is read from `lighting_effect_state` in the device
/// info block.
#[derive(Debug)]
pub struct IotLightEffect {
    base: ModuleBase,
}

impl IotLightEffect {
    /// Creates the module.
    #[must_use]
    pub fn new(device: DeviceHandle) -> Self {
        Self {
            base: ModuleBase::new(LIGHT_EFFECT, device),
        }
    }

    fn effect_state(&self) -> Result<Value> {
        self.base
            .with_info(|info| info.get("lighting_effect_state").cloned())?
            .ok_or_else(|| ParseError::MissingField("lighting_effect_state".to_string()).into())
    }

    async fn send_effect(&self, effect: Value) -> Result<Value> {
        iot::call(self.base.device(), LIGHT_STRIP, "set_lighting_effect", effect).await
    }
}

impl Module for IotLightEffect {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        initialize_light_effect_features(&self, features)
    }

    fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
        match name {
            "effect" => Some(self.effect().map(Into::into)),
            "effect_list" => Some(self.effect_list().map(Into::into)),
            _ => None,
        }
    }

    fn as_light_effect(self: Arc<Self>) -> Option<Arc<dyn LightEffect>> {
        Some(self)
    }
}

#[async_trait]
impl LightEffect for IotLightEffect {
    fn has_custom_effects(&self) -> bool {
        true
    }

    fn effect(&self) -> Result<String> {
        let state = self.effect_state()?;
        if int(&state, "enable")? == 0 {
            return Ok(LIGHT_EFFECTS_OFF.to_string());
        }
        Ok(state
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(LIGHT_EFFECTS_OFF)
            .to_string())
    }

    fn effect_list(&self) -> Result<Vec<String>> {
        Ok(std::iter::once(LIGHT_EFFECTS_OFF)
            .chain(EFFECT_NAMES.iter().copied())
            .map(str::to_string)
            .collect())
    }

    async fn set_effect(
        &self,
        effect: &str,
        brightness: Option<u8>,
        transition: Option<u32>,
    ) -> Result<Value> {
        crate::interfaces::check_effect(self, effect)?;
        if effect == LIGHT_EFFECTS_OFF {
            let mut state = self.effect_state()?;
            state["enable"] = json!(0);
            return self.send_effect(state).await;
        }
        let mut request = Map::new();
        request.insert("name".into(), effect.into());
        request.insert("enable".into(), 1.into());
        request.insert("custom".into(), 0.into());
        if let Some(brightness) = brightness {
            request.insert("brightness".into(), brightness.into());
        }
        if let Some(transition) = transition {
            request.insert("transition".into(), transition.into());
        }
        self.send_effect(Value::Object(request)).await
    }

    async fn set_custom_effect(&self, effect: Value) -> Result<Value> {
        if !effect.is_object() {
            return Err(ParseError::UnexpectedFormat("effect must be an object".to_string()).into());
        }
        self.send_effect(effect).await
    }
}
