// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by modules of both protocol families.
//!
//! # Types
//!
//! - [`FeatureValue`] - Dynamically typed feature value
//! - [`Hsv`] - Light color (Hue 0-360, Saturation 0-100, Value 0-100)
//! - [`ColorTempRange`] - Supported white temperature range in Kelvin
//! - [`LightState`] - All light parameters at once
//! - [`EmeterStatus`] - Energy meter readings with unit conversion
//! - [`DeviceType`] / [`DeviceIdentity`] - What the device is

mod color;
mod device_type;
mod emeter;
mod light_state;
mod value;

pub use color::{ColorTempRange, Hsv};
pub use device_type::{DeviceIdentity, DeviceType};
pub use emeter::EmeterStatus;
pub use light_state::LightState;
pub(crate) use light_state::check_brightness;
pub use value::FeatureValue;
