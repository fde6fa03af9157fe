// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Modules of legacy devices.

mod emeter;
mod led;
mod light;
mod light_effect;

pub use emeter::Emeter;
pub use led::Led;
pub use light::IotLight;
pub use light_effect::{EFFECT_NAMES, IotLightEffect};

use serde_json::Value;

use crate::error::{ParseError, Result};

/// Name of the energy module.
pub const ENERGY: &str = "energy";
/// Name of the light module.
pub const LIGHT: &str = "light";
/// Name of the status LED module.
pub const LED: &str = "led";
/// Name of the light effect module.
pub const LIGHT_EFFECT: &str = "light_effect";

/// Namespace of bulb light control.
pub const LIGHTING_SERVICE: &str = "smartlife.iot.smartbulb.lightingservice";
/// Namespace of light strip control.
pub const LIGHT_STRIP: &str = "smartlife.iot.lightStrip";
/// Namespace of wall dimmer control.
pub const DIMMER: &str = "smartlife.iot.dimmer";

fn int(value: &Value, key: &str) -> Result<i64> {
    value
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ParseError::MissingField(key.to_string()).into())
}

fn narrow<T: TryFrom<i64>>(value: &Value, key: &str) -> Result<T> {
    let raw = int(value, key)?;
    T::try_from(raw).map_err(|_| {
        ParseError::InvalidValue {
            field: key.to_string(),
            message: format!("{raw} is out of range"),
        }
        .into()
    })
}
