// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color types for light control.
//!
//! Both protocol families express color as hue (degrees), saturation and
//! value (percent), and white temperature in Kelvin within a per-model range.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// HSV color representation (Hue, Saturation, Value).
///
/// # Examples
///
/// ```
/// use kasalink::types::Hsv;
///
/// let red = Hsv::new(0, 100, 100).unwrap();
/// assert_eq!(red.hue(), 0);
/// assert_eq!(red.saturation(), 100);
/// assert_eq!(red.value(), 100);
///
/// assert!(Hsv::new(361, 0, 0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hsv {
    hue: u16,
    saturation: u8,
    value: u8,
}

impl Hsv {
    /// Maximum hue value.
    pub const MAX_HUE: u16 = 360;

    /// Maximum saturation value.
    pub const MAX_SATURATION: u8 = 100;

    /// Maximum value (brightness).
    pub const MAX_VALUE: u8 = 100;

    /// Creates a new HSV color.
    ///
    /// # Arguments
    ///
    /// * `hue` - Color hue (0-360 degrees, where 0/360 is red)
    /// * `saturation` - Color saturation (0-100%)
    /// * `value` - Color brightness (0-100%)
    ///
    /// # Errors
    ///
    /// Returns error if any component is outside its valid range.
    pub fn new(hue: u16, saturation: u8, value: u8) -> Result<Self, ValueError> {
        if hue > Self::MAX_HUE {
            return Err(ValueError::InvalidHue(hue));
        }
        if saturation > Self::MAX_SATURATION {
            return Err(ValueError::InvalidSaturation(saturation));
        }
        if value > Self::MAX_VALUE {
            return Err(ValueError::InvalidBrightness(value));
        }
        Ok(Self {
            hue,
            saturation,
            value,
        })
    }

    /// Returns the hue value (0-360).
    #[must_use]
    pub const fn hue(&self) -> u16 {
        self.hue
    }

    /// Returns the saturation value (0-100).
    #[must_use]
    pub const fn saturation(&self) -> u8 {
        self.saturation
    }

    /// Returns the brightness value (0-100).
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.value
    }

    /// Creates a new color with a different brightness.
    ///
    /// # Errors
    ///
    /// Returns error if brightness is greater than 100.
    pub fn with_value(&self, value: u8) -> Result<Self, ValueError> {
        Self::new(self.hue, self.saturation, value)
    }
}

impl fmt::Display for Hsv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HSV({}, {}%, {}%)", self.hue, self.saturation, self.value)
    }
}

/// Supported white temperature range of a light, in Kelvin.
///
/// A range of `0..0` means the light has no adjustable white temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorTempRange {
    /// Warmest supported temperature.
    pub min: u16,
    /// Coolest supported temperature.
    pub max: u16,
}

impl ColorTempRange {
    /// Range reported for lights without variable temperature.
    pub const NONE: Self = Self { min: 0, max: 0 };

    /// Creates a new range.
    #[must_use]
    pub const fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    /// Returns `true` if the light supports no temperature adjustment.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.max == 0
    }

    /// Validates a temperature against this range.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the temperature is outside the range.
    pub fn check(&self, kelvin: i64) -> Result<u16, ValueError> {
        if kelvin < i64::from(self.min) || kelvin > i64::from(self.max) {
            return Err(ValueError::OutOfRange {
                min: i64::from(self.min),
                max: i64::from(self.max),
                actual: kelvin,
            });
        }
        // Bounded by `max` above.
        Ok(u16::try_from(kelvin).unwrap_or(self.max))
    }
}

impl fmt::Display for ColorTempRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}K-{}K", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsv_valid() {
        let color = Hsv::new(180, 50, 75).unwrap();
        assert_eq!(color.hue(), 180);
        assert_eq!(color.saturation(), 50);
        assert_eq!(color.value(), 75);
    }

    #[test]
    fn hsv_invalid_components() {
        assert!(matches!(Hsv::new(361, 50, 50), Err(ValueError::InvalidHue(361))));
        assert!(matches!(
            Hsv::new(180, 101, 50),
            Err(ValueError::InvalidSaturation(101))
        ));
        assert!(matches!(
            Hsv::new(180, 50, 101),
            Err(ValueError::InvalidBrightness(101))
        ));
    }

    #[test]
    fn hsv_with_value() {
        let dimmed = Hsv::new(120, 100, 100).unwrap().with_value(10).unwrap();
        assert_eq!(dimmed.hue(), 120);
        assert_eq!(dimmed.value(), 10);
    }

    #[test]
    fn temp_range_check() {
        let range = ColorTempRange::new(2500, 6500);
        assert_eq!(range.check(2700).unwrap(), 2700);
        assert_eq!(
            range.check(9000),
            Err(ValueError::OutOfRange {
                min: 2500,
                max: 6500,
                actual: 9000
            })
        );
        assert!(ColorTempRange::NONE.is_empty());
        assert_eq!(range.to_string(), "2500K-6500K");
    }
}
