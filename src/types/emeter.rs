// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Energy meter readings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const VALID_KEYS: &[&str] = &[
    "voltage_mv",
    "power_mw",
    "current_ma",
    "energy_wh",
    "total_wh",
    "voltage",
    "power",
    "current",
    "total",
    "energy",
];

/// Energy meter readings as reported by the device.
///
/// Newer firmware reports values with a unit suffix (`power_mw`,
/// `voltage_mv`), older firmware without (`power`, `voltage`). Lookups
/// convert between the two so callers can ask for either form.
///
/// # Examples
///
/// ```
/// use kasalink::types::EmeterStatus;
///
/// let status = EmeterStatus::from_value(&serde_json::json!({
///     "power_mw": 5000,
///     "voltage_mv": 230_100,
/// }));
/// assert_eq!(status.power(), Some(5.0));
/// assert_eq!(status.get("power_mw"), Some(5000.0));
/// assert_eq!(status.voltage(), Some(230.1));
/// assert_eq!(status.current(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmeterStatus(Map<String, Value>);

impl EmeterStatus {
    /// Creates a status from raw device readings.
    #[must_use]
    pub fn new(readings: Map<String, Value>) -> Self {
        Self(readings)
    }

    /// Creates a status from a JSON value, ignoring non-object values.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self(value.as_object().cloned().unwrap_or_default())
    }

    /// Returns the raw readings.
    #[must_use]
    pub fn raw(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns a reading in the unit implied by `key`.
    ///
    /// Suffixed keys are scaled up from their plain counterpart and plain
    /// keys are scaled down from any suffixed counterpart.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        if let Some(value) = self.0.get(key) {
            return value.as_f64();
        }
        if !VALID_KEYS.contains(&key) {
            return None;
        }
        if let Some((base, _)) = key.split_once('_') {
            return self.0.get(base).and_then(Value::as_f64).map(|v| v * 1000.0);
        }
        self.0
            .iter()
            .filter(|(k, _)| k.starts_with(key))
            .find_map(|(_, v)| v.as_f64())
            .map(|v| v / 1000.0)
    }

    /// Returns power in W.
    #[must_use]
    pub fn power(&self) -> Option<f64> {
        self.get("power")
    }

    /// Returns voltage in V.
    #[must_use]
    pub fn voltage(&self) -> Option<f64> {
        self.get("voltage")
    }

    /// Returns current in A.
    #[must_use]
    pub fn current(&self) -> Option<f64> {
        self.get("current")
    }

    /// Returns total consumption in kWh.
    #[must_use]
    pub fn total(&self) -> Option<f64> {
        self.get("total")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_keys_are_upscaled() {
        let status = EmeterStatus::from_value(&json!({"power": 1.5, "total": 0.25}));
        assert_eq!(status.get("power_mw"), Some(1500.0));
        assert_eq!(status.get("total_wh"), Some(250.0));
        assert_eq!(status.power(), Some(1.5));
    }

    #[test]
    fn suffixed_keys_are_downscaled() {
        let status = EmeterStatus::from_value(&json!({"current_ma": 250, "total_wh": 1200}));
        assert_eq!(status.current(), Some(0.25));
        assert_eq!(status.total(), Some(1.2));
    }

    #[test]
    fn unknown_keys_are_absent() {
        let status = EmeterStatus::from_value(&json!({"power_mw": 10}));
        assert_eq!(status.get("frequency"), None);
        assert_eq!(status.voltage(), None);
    }
}
