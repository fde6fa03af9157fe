// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Composite light state.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// A snapshot of every light parameter at once.
///
/// Light modules assemble this after each refresh from the values the other
/// light-related modules just received, and accept it as a single request
/// in `set_state`. Unset fields are left untouched on the device.
///
/// # Examples
///
/// ```
/// use kasalink::types::LightState;
///
/// let state = LightState::default().with_on(true).with_brightness(40);
/// assert_eq!(state.light_on, Some(true));
/// assert_eq!(state.brightness, Some(40));
/// assert_eq!(state.hue, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    /// Whether the light is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_on: Option<bool>,
    /// Brightness in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    /// Hue in degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    /// Saturation in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation: Option<u8>,
    /// White temperature in Kelvin; zero while a color is active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_temp: Option<u16>,
    /// Transition time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<u32>,
}

impl LightState {
    /// Sets the on/off state.
    #[must_use]
    pub fn with_on(mut self, on: bool) -> Self {
        self.light_on = Some(on);
        self
    }

    /// Sets the brightness.
    #[must_use]
    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = Some(brightness);
        self
    }

    /// Sets the color temperature.
    #[must_use]
    pub fn with_color_temp(mut self, kelvin: u16) -> Self {
        self.color_temp = Some(kelvin);
        self
    }

    /// Sets the transition time.
    #[must_use]
    pub fn with_transition(mut self, millis: u32) -> Self {
        self.transition = Some(millis);
        self
    }
}

/// Validates a brightness percentage.
pub(crate) fn check_brightness(value: i64) -> Result<u8, ValueError> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= 100)
        .ok_or(ValueError::OutOfRange {
            min: 0,
            max: 100,
            actual: value,
        })
}
