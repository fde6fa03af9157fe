// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capabilities of legacy devices.
//!
//! Legacy devices advertise what they can do through flags in their
//! `get_sysinfo` reply. The flags are read once per negotiation and decide
//! which modules a device gets.

use serde_json::Value;

use crate::types::{ColorTempRange, DeviceType};

/// White temperature ranges by model prefix.
const TEMPERATURE_RANGES: &[(&str, ColorTempRange)] = &[
    ("LB130", ColorTempRange::new(2500, 9000)),
    ("LB120", ColorTempRange::new(2700, 6500)),
    ("LB230", ColorTempRange::new(2500, 9000)),
    ("KB130", ColorTempRange::new(2500, 9000)),
    ("KL130", ColorTempRange::new(2500, 9000)),
    ("KL125", ColorTempRange::new(2500, 6500)),
    ("KL135", ColorTempRange::new(2500, 6500)),
    ("KL120", ColorTempRange::new(2700, 6500)),
    ("KL430", ColorTempRange::new(2500, 9000)),
    ("KL400", ColorTempRange::new(2500, 9000)),
];

/// Range assumed for variable-temperature models not listed above.
const DEFAULT_TEMPERATURE_RANGE: ColorTempRange = ColorTempRange::new(2700, 5000);

/// Wall switch model prefixes; everything else relay-based is a plug.
const WALL_SWITCH_MODELS: &[&str] = &["HS200", "HS210", "KS200", "KS230"];

/// Capabilities of a legacy device.
///
/// # Examples
///
/// ```
/// use kasalink::iot::IotCapabilities;
/// use kasalink::types::DeviceType;
/// use serde_json::json;
///
/// let caps = IotCapabilities::from_sys_info(&json!({
///     "mic_type": "IOT.SMARTPLUGSWITCH",
///     "model": "HS110(EU)",
///     "feature": "TIM:ENE",
///     "relay_state": 1,
///     "led_off": 0,
/// }));
/// assert_eq!(caps.device_type, DeviceType::Plug);
/// assert!(caps.has_emeter);
/// assert!(caps.has_led);
/// assert!(!caps.is_light());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
// Each flag mirrors an independent sysinfo field.
#[allow(clippy::struct_excessive_bools)]
pub struct IotCapabilities {
    /// Kind of device derived from the sysinfo type fields.
    pub device_type: DeviceType,

    /// Model string.
    pub model: String,

    /// Has an energy meter.
    pub has_emeter: bool,

    /// Brightness can be adjusted.
    pub is_dimmable: bool,

    /// Supports colors.
    pub is_color: bool,

    /// White temperature can be adjusted.
    pub is_variable_color_temp: bool,

    /// Supports lighting effects.
    pub has_effects: bool,

    /// Has a controllable status LED.
    pub has_led: bool,
}

impl IotCapabilities {
    /// Detects capabilities from a `get_sysinfo` reply.
    #[must_use]
    pub fn from_sys_info(info: &Value) -> Self {
        let device_type = device_type_from(info);
        let flag = |key: &str| info.get(key).and_then(Value::as_i64).is_some_and(|v| v != 0);

        Self {
            device_type,
            model: info
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            has_emeter: info
                .get("feature")
                .and_then(Value::as_str)
                .is_some_and(|f| f.contains("ENE")),
            is_dimmable: flag("is_dimmable") || device_type == DeviceType::Dimmer,
            is_color: flag("is_color"),
            is_variable_color_temp: flag("is_variable_color_temp"),
            has_effects: info.get("lighting_effect_state").is_some(),
            has_led: info.get("led_off").is_some(),
        }
    }

    /// Returns `true` for bulbs, light strips and dimmers.
    #[must_use]
    pub fn is_light(&self) -> bool {
        self.device_type.is_light() || self.device_type == DeviceType::Dimmer
    }

    /// Returns the white temperature range of the model.
    #[must_use]
    pub fn temperature_range(&self) -> ColorTempRange {
        if !self.is_variable_color_temp {
            return ColorTempRange::NONE;
        }
        TEMPERATURE_RANGES
            .iter()
            .find(|(prefix, _)| self.model.starts_with(prefix))
            .map_or(DEFAULT_TEMPERATURE_RANGE, |(_, range)| *range)
    }
}

/// Reads the device type from the sysinfo type fields.
pub(crate) fn device_type_from(info: &Value) -> DeviceType {
    let kind = info
        .get("type")
        .or_else(|| info.get("mic_type"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_ascii_lowercase();
    let model = info.get("model").and_then(Value::as_str).unwrap_or_default();

    if kind.contains("smartbulb") {
        if info.get("length").is_some() {
            return DeviceType::LightStrip;
        }
        return DeviceType::Bulb;
    }
    if kind.contains("smartplug") {
        if info
            .get("children")
            .and_then(Value::as_array)
            .is_some_and(|children| !children.is_empty())
        {
            return DeviceType::Strip;
        }
        if info.get("brightness").is_some() {
            return DeviceType::Dimmer;
        }
        if WALL_SWITCH_MODELS.iter().any(|prefix| model.starts_with(prefix)) {
            return DeviceType::WallSwitch;
        }
        return DeviceType::Plug;
    }
    DeviceType::Unknown
}

/// Builder for capabilities of devices that are not probed.
#[derive(Debug, Default)]
pub struct IotCapabilitiesBuilder {
    inner: IotCapabilities,
}

impl IotCapabilitiesBuilder {
    /// Creates a builder for a device of the given type.
    #[must_use]
    pub fn new(device_type: DeviceType) -> Self {
        Self {
            inner: IotCapabilities {
                device_type,
                ..IotCapabilities::default()
            },
        }
    }

    /// Sets the model string.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.inner.model = model.into();
        self
    }

    /// Enables the energy meter.
    #[must_use]
    pub fn with_emeter(mut self) -> Self {
        self.inner.has_emeter = true;
        self
    }

    /// Enables brightness control.
    #[must_use]
    pub fn with_dimmer(mut self) -> Self {
        self.inner.is_dimmable = true;
        self
    }

    /// Enables color control.
    #[must_use]
    pub fn with_color(mut self) -> Self {
        self.inner.is_color = true;
        self
    }

    /// Enables white temperature control.
    #[must_use]
    pub fn with_color_temp(mut self) -> Self {
        self.inner.is_variable_color_temp = true;
        self
    }

    /// Enables lighting effects.
    #[must_use]
    pub fn with_effects(mut self) -> Self {
        self.inner.has_effects = true;
        self
    }

    /// Enables the status LED.
    #[must_use]
    pub fn with_led(mut self) -> Self {
        self.inner.has_led = true;
        self
    }

    /// Builds the capabilities.
    #[must_use]
    pub fn build(self) -> IotCapabilities {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn color_bulb_capabilities() {
        let caps = IotCapabilities::from_sys_info(&json!({
            "mic_type": "IOT.SMARTBULB",
            "model": "KL130(EU)",
            "is_dimmable": 1,
            "is_color": 1,
            "is_variable_color_temp": 1,
            "light_state": {"on_off": 1},
        }));
        assert_eq!(caps.device_type, DeviceType::Bulb);
        assert!(caps.is_light());
        assert!(caps.is_color);
        assert!(!caps.has_emeter);
        assert!(!caps.has_effects);
        assert_eq!(caps.temperature_range(), ColorTempRange::new(2500, 9000));
    }

    #[test]
    fn light_strip_has_effects() {
        let caps = IotCapabilities::from_sys_info(&json!({
            "mic_type": "IOT.SMARTBULB",
            "model": "KL430(US)",
            "length": 16,
            "is_dimmable": 1,
            "lighting_effect_state": {"enable": 0, "name": "Aurora"},
        }));
        assert_eq!(caps.device_type, DeviceType::LightStrip);
        assert!(caps.has_effects);
        assert_eq!(caps.temperature_range(), ColorTempRange::NONE);
    }

    #[test]
    fn plug_variants() {
        let dimmer = json!({"type": "IOT.SMARTPLUGSWITCH", "model": "HS220(US)", "brightness": 50});
        let switch = json!({"type": "IOT.SMARTPLUGSWITCH", "model": "HS200(US)"});
        let strip = json!({
            "type": "IOT.SMARTPLUGSWITCH",
            "model": "HS300(US)",
            "children": [{"id": "00"}],
        });
        assert_eq!(device_type_from(&dimmer), DeviceType::Dimmer);
        assert!(IotCapabilities::from_sys_info(&dimmer).is_dimmable);
        assert_eq!(device_type_from(&switch), DeviceType::WallSwitch);
        assert_eq!(device_type_from(&strip), DeviceType::Strip);
        assert_eq!(device_type_from(&json!({})), DeviceType::Unknown);
    }

    #[test]
    fn unknown_variable_temp_model_uses_default_range() {
        let caps = IotCapabilitiesBuilder::new(DeviceType::Bulb)
            .model("XX100")
            .with_dimmer()
            .with_color_temp()
            .build();
        assert_eq!(caps.temperature_range(), ColorTempRange::new(2700, 5000));
    }

    #[test]
    fn builder_pattern() {
        let caps = IotCapabilitiesBuilder::new(DeviceType::Plug)
            .with_emeter()
            .with_led()
            .build();
        assert!(caps.has_emeter);
        assert!(caps.has_led);
        assert!(!caps.is_dimmable);
        assert!(!caps.is_light());
    }
}
