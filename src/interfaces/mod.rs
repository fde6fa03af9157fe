// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capability interfaces implemented by modules of both families.
//!
//! Each interface is a module subtrait, so code written against
//! [`Energy`], [`Light`] or [`LightEffect`] works the same for a legacy
//! plug and a structured one. A device hands them out through
//! [`Device::energy`](crate::Device::energy) and friends.

mod energy;
mod light;
mod light_effect;

pub use energy::{
    ENERGY_DEPRECATED_ATTRIBUTES, ENERGY_DEPRECATED_METHODS, Energy, energy_attribute,
    initialize_energy_features,
};
pub use light::{Light, light_attribute};
pub use light_effect::{LIGHT_EFFECTS_OFF, LightEffect, initialize_light_effect_features};

pub(crate) use light::check_state;
pub(crate) use light_effect::check_effect;
