// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structured protocol family.
//!
//! Requests are JSON objects keyed by method name:
//!
//! ```json
//! {"get_device_info": null, "get_energy_usage": null}
//! ```
//!
//! The reply carries one result per method. A result of the form
//! `{"error_code": n}` with a non-zero `n` marks that single method as
//! failed, leaving the module that asked for it without data for the
//! cycle. Capabilities are the component list from `component_nego`.

mod components;
pub mod modules;

pub use components::{Components, Requirement};

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

use crate::config::ProtocolFamily;
use crate::device::DeviceHandle;
use crate::error::{DeviceError, ParseError, Result};
use crate::family::{Family, ModuleDescriptor};
use crate::module::route_by_keys;
use crate::transport::{Request, Response};
use crate::types::{DeviceIdentity, DeviceType};

/// Method returning the device info block.
pub const DEVICE_INFO: &str = "get_device_info";

/// Method returning the component list.
pub const COMPONENT_NEGOTIATION: &str = "component_nego";

/// Info fields the device reports base64-encoded.
const ENCODED_FIELDS: &[&str] = &["nickname", "ssid"];

/// The structured protocol family.
#[derive(Debug, Clone, Copy, Default)]
pub struct Smart;

/// Builds a request calling one method.
#[must_use]
pub fn request(method: &str, params: Value) -> Request {
    let mut request = Request::new();
    request.insert(method.to_string(), params);
    request
}

/// Calls one method outside the refresh cycle and returns its result.
///
/// # Errors
///
/// Returns the transport error, `ParseError::MissingField` if the reply
/// lacks the method, or `DeviceError::CommandRejected` for a non-zero
/// `error_code`.
pub async fn call(device: &DeviceHandle, method: &str, params: Value) -> Result<Value> {
    let response = device.send(&request(method, params)).await?;
    let result = response
        .get(method)
        .cloned()
        .ok_or_else(|| ParseError::MissingField(method.to_string()))?;
    check_result(method, &result)?;
    Ok(result)
}

fn error_code(result: &Value) -> i64 {
    result.get("error_code").and_then(Value::as_i64).unwrap_or(0)
}

fn check_result(method: &str, result: &Value) -> Result<()> {
    match error_code(result) {
        0 => Ok(()),
        code => Err(DeviceError::CommandRejected {
            method: method.to_string(),
            code,
        }
        .into()),
    }
}

/// Decodes the base64 text fields of an info block in place.
///
/// Fields that are not valid base64 UTF-8 are left as they are.
fn decode_fields(info: &mut Value) {
    for field in ENCODED_FIELDS {
        let decoded = info
            .get(*field)
            .and_then(Value::as_str)
            .and_then(|text| STANDARD.decode(text).ok())
            .and_then(|bytes| String::from_utf8(bytes).ok());
        if let Some(decoded) = decoded {
            info[*field] = Value::String(decoded);
        }
    }
}

fn text(info: &Value, key: &str) -> Option<String> {
    info.get(key).and_then(Value::as_str).map(str::to_string)
}

fn device_type_from(info: &Value) -> DeviceType {
    let kind = info.get("type").and_then(Value::as_str).unwrap_or_default();
    let model = info.get("model").and_then(Value::as_str).unwrap_or_default();
    match kind {
        "SMART.TAPOPLUG" | "SMART.KASAPLUG" if info.get("fan_speed_level").is_some() => {
            DeviceType::Fan
        }
        "SMART.TAPOPLUG" | "SMART.KASAPLUG" => DeviceType::Plug,
        "SMART.TAPOBULB" | "SMART.KASABULB" if model.starts_with("L9") => DeviceType::LightStrip,
        "SMART.TAPOBULB" | "SMART.KASABULB" => DeviceType::Bulb,
        "SMART.TAPOSWITCH" | "SMART.KASASWITCH" if info.get("fan_speed_level").is_some() => {
            DeviceType::Fan
        }
        "SMART.TAPOSWITCH" | "SMART.KASASWITCH" if info.get("brightness").is_some() => {
            DeviceType::Dimmer
        }
        "SMART.TAPOSWITCH" | "SMART.KASASWITCH" => DeviceType::WallSwitch,
        "SMART.TAPOHUB" | "SMART.KASAHUB" => DeviceType::Hub,
        "SMART.TAPOSENSOR" => DeviceType::Sensor,
        _ => DeviceType::Unknown,
    }
}

impl Family for Smart {
    type Capabilities = Components;
    type Admission = Requirement;

    const PROTOCOL: ProtocolFamily = ProtocolFamily::Smart;

    fn negotiation_request() -> Request {
        let mut request = request(COMPONENT_NEGOTIATION, Value::Null);
        request.insert(DEVICE_INFO.to_string(), Value::Null);
        request
    }

    fn capabilities_from(response: &Response) -> Result<Components> {
        let result = response
            .get(COMPONENT_NEGOTIATION)
            .ok_or_else(|| ParseError::MissingField(COMPONENT_NEGOTIATION.to_string()))?;
        check_result(COMPONENT_NEGOTIATION, result)?;
        Components::from_negotiation(result)
    }

    fn info_request() -> Request {
        request(DEVICE_INFO, Value::Null)
    }

    fn info_from(response: &Response) -> Result<Value> {
        let info = response
            .get(DEVICE_INFO)
            .filter(|info| info.is_object())
            .ok_or_else(|| ParseError::MissingField(DEVICE_INFO.to_string()))?;
        check_result(DEVICE_INFO, info)?;
        let mut info = info.clone();
        decode_fields(&mut info);
        Ok(info)
    }

    fn identity_from(info: &Value) -> DeviceIdentity {
        DeviceIdentity {
            device_type: device_type_from(info),
            model: text(info, "model").unwrap_or_default(),
            alias: text(info, "nickname"),
            device_id: text(info, "device_id"),
            mac: text(info, "mac"),
            firmware: text(info, "fw_ver"),
        }
    }

    fn is_on(info: &Value) -> Option<bool> {
        info.get("device_on").and_then(Value::as_bool)
    }

    fn power_request(on: bool, _capabilities: &Components) -> Request {
        request("set_device_info", json!({ "device_on": on }))
    }

    fn check_reply(response: &Response) -> Result<()> {
        response
            .iter()
            .try_for_each(|(method, result)| check_result(method, result))
    }

    fn admits(requirement: &Requirement, components: &Components, info: &Value) -> bool {
        requirement.is_met(components, info)
    }

    fn route(query: &Request, response: &Response) -> Option<Value> {
        for method in query.keys() {
            if let Some(code) = response.get(method).map(error_code).filter(|c| *c != 0) {
                tracing::warn!(method = %method, code, "Method failed on device");
            }
        }
        route_by_keys(query, response, |result| error_code(result) == 0)
    }

    fn default_catalog() -> Vec<ModuleDescriptor<Self>> {
        use modules::{
            Alarm, Brightness, Color, ColorTemperature, DeviceModule, Fan, MotionSensor, SmartEnergy,
            SmartLed, SmartLight,
        };

        vec![
            ModuleDescriptor::<Self>::new(
                modules::DEVICE,
                Requirement::component("device"),
                |device, components| Arc::new(DeviceModule::new(device, components)),
            ),
            ModuleDescriptor::<Self>::new(
                modules::ENERGY,
                Requirement::component("energy_monitoring"),
                |device, components| Arc::new(SmartEnergy::new(device, components)),
            ),
            ModuleDescriptor::<Self>::new(
                modules::BRIGHTNESS,
                Requirement::component("brightness"),
                |device, _| Arc::new(Brightness::new(device)),
            ),
            ModuleDescriptor::<Self>::new(
                modules::COLOR_TEMPERATURE,
                Requirement::component("color_temperature"),
                |device, _| Arc::new(ColorTemperature::new(device)),
            ),
            ModuleDescriptor::<Self>::new(
                modules::COLOR,
                Requirement::component("color"),
                |device, _| Arc::new(Color::new(device)),
            ),
            ModuleDescriptor::<Self>::new(
                modules::LIGHT,
                Requirement::component("brightness"),
                |device, components| Arc::new(SmartLight::new(device, components)),
            ),
            ModuleDescriptor::<Self>::new(
                modules::MOTION,
                Requirement::key_on_parent("detected"),
                |device, _| Arc::new(MotionSensor::new(device)),
            ),
            ModuleDescriptor::<Self>::new(
                modules::FAN,
                Requirement::component("fan_control"),
                |device, _| Arc::new(Fan::new(device)),
            ),
            ModuleDescriptor::<Self>::new(
                modules::ALARM,
                Requirement::component("alarm"),
                |device, _| Arc::new(Alarm::new(device)),
            ),
            ModuleDescriptor::<Self>::new(
                modules::LED,
                Requirement::component("led"),
                |device, _| Arc::new(SmartLed::new(device)),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn response(value: Value) -> Response {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn negotiation_asks_for_components_and_info() {
        let request = Smart::negotiation_request();
        assert_eq!(
            Value::Object(request),
            json!({"component_nego": null, "get_device_info": null})
        );
    }

    #[test]
    fn info_decodes_base64_fields() {
        let reply = response(json!({
            "get_device_info": {
                "nickname": STANDARD.encode("Living room"),
                "ssid": STANDARD.encode("home"),
                "model": "P110",
            }
        }));
        let info = Smart::info_from(&reply).unwrap();
        assert_eq!(info["nickname"], "Living room");
        assert_eq!(info["ssid"], "home");
        assert_eq!(info["model"], "P110");
    }

    #[test]
    fn identity_reads_info_block() {
        let info = json!({
            "type": "SMART.TAPOBULB",
            "model": "L530",
            "nickname": "Desk",
            "device_id": "80221",
            "mac": "AC-15-A2-00-00-01",
            "fw_ver": "1.1.0",
            "device_on": true,
        });
        let identity = Smart::identity_from(&info);
        assert_eq!(identity.device_type, DeviceType::Bulb);
        assert_eq!(identity.model, "L530");
        assert_eq!(identity.alias.as_deref(), Some("Desk"));
        assert_eq!(Smart::is_on(&info), Some(true));
        assert_eq!(
            device_type_from(&json!({"type": "SMART.TAPOBULB", "model": "L900-5"})),
            DeviceType::LightStrip
        );
        assert_eq!(
            device_type_from(&json!({"type": "SMART.KASASWITCH", "brightness": 10})),
            DeviceType::Dimmer
        );
    }

    #[test]
    fn route_drops_failed_methods() {
        let query = request("get_fan_info", Value::Null);
        let reply = response(json!({"get_fan_info": {"error_code": -10008}}));
        assert_eq!(Smart::route(&query, &reply), None);

        let query = request("energy", Value::Null);
        let reply = response(json!({"energy": {"power_mw": 5000}}));
        assert_eq!(Smart::route(&query, &reply), Some(json!({"power_mw": 5000})));
    }

    #[test]
    fn check_reply_reports_failed_method() {
        let reply = response(json!({
            "set_device_info": {},
            "set_led_info": {"error_code": -1008},
        }));
        assert!(matches!(
            Smart::check_reply(&reply),
            Err(Error::Device(DeviceError::CommandRejected { ref method, code: -1008 }))
                if method == "set_led_info"
        ));
    }

    #[test]
    fn catalog_names_are_unique() {
        let catalog = Smart::default_catalog();
        let mut names: Vec<_> = catalog.iter().map(|d| d.name().to_string()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), catalog.len());
    }
}
