// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light control interface.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DeviceError, Result, ValueError};
use crate::module::Module;
use crate::types::{ColorTempRange, FeatureValue, Hsv, LightState, check_brightness};

/// A dimmable, possibly colored light.
///
/// Getters read the last refresh cycle and fail with
/// `DeviceError::UnsupportedCapability` if the light lacks the capability.
/// Setters take effect on the device immediately but are only visible
/// through the getters after the next refresh.
#[async_trait]
pub trait Light: Module {
    /// Returns `true` if brightness can be adjusted.
    fn is_dimmable(&self) -> bool;

    /// Returns `true` if the light supports colors.
    fn is_color(&self) -> bool;

    /// Returns `true` if the white temperature can be adjusted.
    fn is_variable_color_temp(&self) -> bool;

    /// Returns `true` if the light supports effects.
    fn has_effects(&self) -> bool;

    /// Returns the brightness in percent.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UnsupportedCapability` for non-dimmable lights.
    fn brightness(&self) -> Result<u8>;

    /// Returns the color.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UnsupportedCapability` for white-only lights.
    fn hsv(&self) -> Result<Hsv>;

    /// Returns the white temperature in Kelvin.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UnsupportedCapability` for fixed-temperature lights.
    fn color_temp(&self) -> Result<u16>;

    /// Returns the supported white temperature range.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UnsupportedCapability` for fixed-temperature lights.
    fn valid_temperature_range(&self) -> Result<ColorTempRange>;

    /// Returns the combined light state computed after the last refresh.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    fn state(&self) -> Result<LightState>;

    /// Sets the brightness in percent.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidBrightness` outside `0..=100`,
    /// `DeviceError::UnsupportedCapability` for non-dimmable lights, or the
    /// transport error.
    async fn set_brightness(&self, brightness: i64, transition: Option<u32>) -> Result<Value>;

    /// Sets the color.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UnsupportedCapability` for white-only lights,
    /// or the transport error.
    async fn set_hsv(&self, hsv: Hsv, transition: Option<u32>) -> Result<Value>;

    /// Sets the white temperature in Kelvin.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` outside
    /// [`valid_temperature_range`](Self::valid_temperature_range),
    /// `DeviceError::UnsupportedCapability`, or the transport error.
    async fn set_color_temp(&self, kelvin: i64, transition: Option<u32>) -> Result<Value>;

    /// Applies several light parameters in one request.
    ///
    /// A brightness of zero switches the light off.
    ///
    /// # Errors
    ///
    /// Returns a `ValueError` for values outside their range,
    /// `DeviceError::UnsupportedCapability` for parameters the light does not
    /// support, the transport error, or `DeviceError::CommandRejected`.
    async fn set_state(&self, state: &LightState) -> Result<Value>;
}

/// Resolves the named light attributes of `light`.
///
/// Light modules call this from [`Module::attribute`].
pub fn light_attribute<L: Light + ?Sized>(light: &L, name: &str) -> Option<Result<FeatureValue>> {
    let value = match name {
        "is_dimmable" => Ok(light.is_dimmable().into()),
        "is_color" => Ok(light.is_color().into()),
        "is_variable_color_temp" => Ok(light.is_variable_color_temp().into()),
        "has_effects" => Ok(light.has_effects().into()),
        "brightness" => light.brightness().map(Into::into),
        "hsv" => light.hsv().map(Into::into),
        "color_temp" => light.color_temp().map(Into::into),
        "valid_temperature_range" => light.valid_temperature_range().map(Into::into),
        "state" => light.state().map(Into::into),
        _ => return None,
    };
    Some(value)
}

/// Validates a requested light state against the capabilities of `light`.
///
/// A color temperature of zero is accepted on color lights, where it
/// selects the color over white.
pub(crate) fn check_state<L: Light + ?Sized>(light: &L, state: &LightState) -> Result<()> {
    if let Some(brightness) = state.brightness {
        if !light.is_dimmable() {
            return Err(DeviceError::unsupported("brightness").into());
        }
        check_brightness(i64::from(brightness))?;
    }
    if state.hue.is_some() || state.saturation.is_some() {
        if !light.is_color() {
            return Err(DeviceError::unsupported("color").into());
        }
        if let Some(hue) = state.hue.filter(|hue| *hue > Hsv::MAX_HUE) {
            return Err(ValueError::InvalidHue(hue).into());
        }
        if let Some(saturation) = state.saturation.filter(|s| *s > Hsv::MAX_SATURATION) {
            return Err(ValueError::InvalidSaturation(saturation).into());
        }
    }
    match state.color_temp {
        Some(0) if light.is_color() => {}
        Some(kelvin) => {
            light.valid_temperature_range()?.check(i64::from(kelvin))?;
        }
        None => {}
    }
    Ok(())
}
