// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light effect interface.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, ValueError};
use crate::feature::{Category, Feature, FeatureMap, FeatureType, add_feature};
use crate::module::Module;

/// Effect name meaning no effect is running.
pub const LIGHT_EFFECTS_OFF: &str = "Off";

/// Built-in and custom lighting effects.
#[async_trait]
pub trait LightEffect: Module {
    /// Returns `true` if custom effects can be uploaded.
    fn has_custom_effects(&self) -> bool;

    /// Returns the running effect, [`LIGHT_EFFECTS_OFF`] if none.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    fn effect(&self) -> Result<String>;

    /// Returns the selectable effects, starting with [`LIGHT_EFFECTS_OFF`].
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    fn effect_list(&self) -> Result<Vec<String>>;

    /// Starts a built-in effect, or stops the running one with
    /// [`LIGHT_EFFECTS_OFF`].
    ///
    /// `brightness` and `transition` override the effect defaults.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidChoice` for unknown effect names, or the
    /// transport error.
    async fn set_effect(
        &self,
        effect: &str,
        brightness: Option<u8>,
        transition: Option<u32>,
    ) -> Result<Value>;

    /// Uploads and starts a custom effect definition.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UnsupportedCapability` if custom effects are not
    /// supported, or the transport error.
    async fn set_custom_effect(&self, effect: Value) -> Result<Value>;
}

/// Checks `effect` against the selectable effects of `module`.
pub(crate) fn check_effect<L: LightEffect + ?Sized>(module: &L, effect: &str) -> Result<()> {
    let choices = module.effect_list()?;
    if choices.iter().any(|choice| choice == effect) {
        return Ok(());
    }
    Err(ValueError::InvalidChoice {
        value: effect.to_string(),
        choices,
    }
    .into())
}

/// Registers the `light_effect` choice feature of `module`.
///
/// # Errors
///
/// Returns `ConfigurationError::DuplicateFeature` if the id is already taken.
pub fn initialize_light_effect_features<L: LightEffect>(
    module: &Arc<L>,
    features: &mut FeatureMap,
) -> Result<()> {
    add_feature(
        features,
        Feature::builder(module, "light_effect", "Light effect")
            .kind(FeatureType::Choice)
            .category(Category::Primary)
            .getter(|m: &L| Ok(m.effect()?.into()))
            .setter(|m: Arc<L>, value| async move {
                let effect = String::try_from(value)?;
                m.set_effect(&effect, None, None).await
            })
            .choices(|m: &L| m.effect_list())
            .build(),
    )
}
