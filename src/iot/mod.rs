// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Legacy protocol family.
//!
//! Requests are JSON objects keyed by namespace, each holding the methods
//! to call in it:
//!
//! ```json
//! {"system": {"get_sysinfo": {}}, "emeter": {"get_realtime": {}}}
//! ```
//!
//! Every method reply carries an `err_code`; a non-zero code marks that
//! method as failed. Modules are admitted by predicates over the flags in
//! `get_sysinfo`, and each module receives the namespace it queried.

mod capabilities;
pub mod modules;

pub use capabilities::{IotCapabilities, IotCapabilitiesBuilder};

use std::sync::Arc;

use serde_json::{Value, json};

use crate::config::{DeviceConfig, ProtocolFamily};
use crate::device::{Device, DeviceHandle};
use crate::error::{DeviceError, ParseError, Result};
use crate::family::{Family, ModuleDescriptor};
use crate::module::route_by_keys;
use crate::transport::{Request, Response, XorTransport};
use crate::types::{DeviceIdentity, DeviceType};

/// Namespace of the system methods.
pub const SYSTEM: &str = "system";

/// Admission predicate of a legacy module.
pub type IotAdmission = fn(&IotCapabilities) -> bool;

/// The legacy protocol family.
#[derive(Debug, Clone, Copy, Default)]
pub struct Iot;

/// Builds a request calling one method.
#[must_use]
pub fn request(namespace: &str, method: &str, params: Value) -> Request {
    let mut request = Request::new();
    request.insert(namespace.to_string(), json!({ method: params }));
    request
}

/// Calls one method outside the refresh cycle and returns its result.
///
/// # Errors
///
/// Returns the transport error, `ParseError::MissingField` if the reply
/// lacks the method, or `DeviceError::CommandRejected` for a non-zero
/// `err_code`.
pub async fn call(
    device: &DeviceHandle,
    namespace: &str,
    method: &str,
    params: Value,
) -> Result<Value> {
    let response = device.send(&request(namespace, method, params)).await?;
    let result = response
        .get(namespace)
        .and_then(|ns| ns.get(method))
        .cloned()
        .ok_or_else(|| ParseError::MissingField(format!("{namespace}.{method}")))?;
    check_result(&format!("{namespace}.{method}"), &result)?;
    Ok(result)
}

fn error_code(result: &Value) -> i64 {
    result.get("err_code").and_then(Value::as_i64).unwrap_or(0)
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

fn text(info: &Value, key: &str) -> Option<String> {
    info.get(key).and_then(Value::as_str).map(str::to_string)
}

impl Family for Iot {
    type Capabilities = IotCapabilities;
    type Admission = IotAdmission;

    const PROTOCOL: ProtocolFamily = ProtocolFamily::Iot;

    fn negotiation_request() -> Request {
        Self::info_request()
    }

    fn capabilities_from(response: &Response) -> Result<IotCapabilities> {
        Ok(IotCapabilities::from_sys_info(&Self::info_from(response)?))
    }

    fn info_request() -> Request {
        request(SYSTEM, "get_sysinfo", json!({}))
    }

    fn info_from(response: &Response) -> Result<Value> {
        let info = response
            .get(SYSTEM)
            .and_then(|system| system.get("get_sysinfo"))
            .filter(|info| info.is_object())
            .ok_or_else(|| ParseError::MissingField("system.get_sysinfo".to_string()))?;
        check_result("system.get_sysinfo", info)?;
        Ok(info.clone())
    }

    fn identity_from(info: &Value) -> DeviceIdentity {
        DeviceIdentity {
            device_type: capabilities::device_type_from(info),
            model: text(info, "model").unwrap_or_default(),
            alias: text(info, "alias"),
            device_id: text(info, "deviceId"),
            mac: text(info, "mac").or_else(|| text(info, "mic_mac")),
            firmware: text(info, "sw_ver"),
        }
    }

    fn is_on(info: &Value) -> Option<bool> {
        info.get("relay_state")
            .or_else(|| info.get("light_state").and_then(|light| light.get("on_off")))
            .and_then(Value::as_i64)
            .map(|state| state != 0)
    }

    fn power_request(on: bool, capabilities: &IotCapabilities) -> Request {
        let state = i64::from(on);
        match capabilities.device_type {
            DeviceType::Bulb => request(
                modules::LIGHTING_SERVICE,
                "transition_light_state",
                json!({"on_off": state, "ignore_default": 1}),
            ),
            DeviceType::LightStrip => request(
                modules::LIGHT_STRIP,
                "set_light_state",
                json!({"on_off": state}),
            ),
            _ => request(SYSTEM, "set_relay_state", json!({ "state": state })),
        }
    }

    fn check_reply(response: &Response) -> Result<()> {
        for (namespace, methods) in response {
            for (method, result) in methods.as_object().into_iter().flatten() {
                check_result(&format!("{namespace}.{method}"), result)?;
            }
        }
        Ok(())
    }

    fn admits(admission: &IotAdmission, capabilities: &IotCapabilities, _info: &Value) -> bool {
        admission(capabilities)
    }

    fn route(query: &Request, response: &Response) -> Option<Value> {
        route_by_keys(query, response, |section| {
            section
                .as_object()
                .is_some_and(|methods| methods.values().all(|result| error_code(result) == 0))
        })
    }

    fn default_catalog() -> Vec<ModuleDescriptor<Self>> {
        vec![
            ModuleDescriptor::<Self>::new(
                modules::ENERGY,
                |caps: &IotCapabilities| caps.has_emeter,
                |device, caps| Arc::new(modules::Emeter::new(device, caps)),
            ),
            ModuleDescriptor::<Self>::new(
                modules::LIGHT,
                |caps: &IotCapabilities| caps.is_light(),
                |device, caps| Arc::new(modules::IotLight::new(device, caps)),
            ),
            ModuleDescriptor::<Self>::new(
                modules::LED,
                |caps: &IotCapabilities| caps.has_led,
                |device, _| Arc::new(modules::Led::new(device)),
            ),
            ModuleDescriptor::<Self>::new(
                modules::LIGHT_EFFECT,
                |caps: &IotCapabilities| caps.has_effects,
                |device, _| Arc::new(modules::IotLightEffect::new(device)),
            ),
        ]
    }
}

impl Device<Iot> {
    /// Connects to a legacy device over TCP and runs a first refresh.
    ///
    /// # Errors
    ///
    /// Returns the error of the negotiation or of the first refresh.
    pub async fn connect(config: DeviceConfig) -> Result<Self> {
        let transport = Arc::new(XorTransport::new(&config));
        Self::builder(config, transport).build().await
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
    fn info_request_shape() {
        assert_eq!(
            Value::Object(Iot::info_request()),
            json!({"system": {"get_sysinfo": {}}})
        );
    }

    #[test]
    fn info_error_code_is_rejected() {
        let reply = response(json!({"system": {"get_sysinfo": {"err_code": -1}}}));
        assert!(matches!(
            Iot::info_from(&reply),
            Err(Error::Device(DeviceError::CommandRejected { code: -1, .. }))
        ));
        assert!(matches!(
            Iot::info_from(&Response::new()),
            Err(Error::Parse(ParseError::MissingField(_)))
        ));
    }

    #[test]
    fn identity_and_power_state() {
        let info = json!({
            "type": "IOT.SMARTPLUGSWITCH",
            "model": "HS110(EU)",
            "alias": "Kettle",
            "deviceId": "8006",
            "mac": "50:C7:BF:00:00:01",
            "sw_ver": "1.5.4",
            "relay_state": 0,
        });
        let identity = Iot::identity_from(&info);
        assert_eq!(identity.device_type, DeviceType::Plug);
        assert_eq!(identity.alias.as_deref(), Some("Kettle"));
        assert_eq!(identity.firmware.as_deref(), Some("1.5.4"));
        assert_eq!(Iot::is_on(&info), Some(false));
        assert_eq!(
            Iot::is_on(&json!({"light_state": {"on_off": 1}})),
            Some(true)
        );
    }

    #[test]
    fn power_request_depends_on_device_type() {
        let plug = IotCapabilitiesBuilder::new(DeviceType::Plug).build();
        let bulb = IotCapabilitiesBuilder::new(DeviceType::Bulb).build();
        assert_eq!(
            Value::Object(Iot::power_request(true, &plug)),
            json!({"system": {"set_relay_state": {"state": 1}}})
        );
        assert_eq!(
            Value::Object(Iot::power_request(false, &bulb)),
            json!({"smartlife.iot.smartbulb.lightingservice": {
                "transition_light_state": {"on_off": 0, "ignore_default": 1}
            }})
        );
    }

    #[test]
    fn route_skips_failed_namespaces() {
        let query = request("emeter", "get_realtime", json!({}));
        let ok = response(json!({"emeter": {"get_realtime": {"power_mw": 1, "err_code": 0}}}));
        let failed = response(json!({"emeter": {"get_realtime": {"err_code": -1}}}));
        assert_eq!(
            Iot::route(&query, &ok),
            Some(json!({"get_realtime": {"power_mw": 1, "err_code": 0}}))
        );
        assert_eq!(Iot::route(&query, &failed), None);
    }

    #[test]
    fn check_reply_reports_method() {
        let reply = response(json!({"system": {"set_relay_state": {"err_code": -3}}}));
        let err = Iot::check_reply(&reply).unwrap_err();
        assert!(matches!(
            err,
            Error::Device(DeviceError::CommandRejected { ref method, code: -3 })
                if method == "system.set_relay_state"
        ));
    }

    #[test]
    fn default_catalog_admission() {
        let plug = IotCapabilitiesBuilder::new(DeviceType::Plug)
            .with_emeter()
            .with_led()
            .build();
        let admitted: Vec<_> = Iot::default_catalog()
            .into_iter()
            .filter(|d| Iot::admits(d.admission(), &plug, &Value::Null))
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(admitted, ["energy", "led"]);

        let bulb = IotCapabilitiesBuilder::new(DeviceType::Bulb)
            .with_dimmer()
            .build();
        let admitted: Vec<_> = Iot::default_catalog()
            .into_iter()
            .filter(|d| Iot::admits(d.admission(), &bulb, &Value::Null))
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(admitted, ["light"]);
    }
}
