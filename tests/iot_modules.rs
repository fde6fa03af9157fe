// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for legacy devices, using the in-memory transport and
//! a local TCP server speaking the XOR framing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local};
use kasalink::iot::Iot;
use kasalink::iot::modules::{Emeter, IotLight, Led};
use kasalink::transport::{MemoryTransport, decrypt, encrypt};
use kasalink::types::{ColorTempRange, DeviceType, Hsv, LightState};
use kasalink::{
    Device, DeviceConfig, DeviceError, Error, FeatureValue, ProtocolFamily, TransportError,
    ValueError,
};
use serde_json::{Map, Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn device(fixture: Value) -> (Device<Iot>, Arc<MemoryTransport>) {
    let transport = Arc::new(MemoryTransport::new(ProtocolFamily::Iot, fixture));
    let device = Device::<Iot>::builder(DeviceConfig::new("127.0.0.1"), transport.clone())
        .build()
        .await
        .unwrap();
    (device, transport)
}

fn plug_info() -> Value {
    json!({
        "alias": "Kettle",
        "model": "HS110(EU)",
        "type": "IOT.SMARTPLUGSWITCH",
        "deviceId": "8006A1",
        "mac": "50:C7:BF:00:00:01",
        "sw_ver": "1.5.4",
        "relay_state": 1,
        "led_off": 0,
        "feature": "TIM:ENE",
        "err_code": 0
    })
}

fn plug() -> Value {
    let now = Local::now();
    json!({
        "system": {"get_sysinfo": plug_info()},
        "emeter": {
            "get_realtime": {
                "power_mw": 1500,
                "voltage_mv": 230_000,
                "current_ma": 20,
                "total_wh": 3000,
                "err_code": 0
            },
            "get_daystat": {
                "day_list": [
                    {"year": now.year(), "month": now.month(), "day": now.day(), "energy_wh": 500}
                ],
                "err_code": 0
            },
            "get_monthstat": {
                "month_list": [
                    {"year": now.year(), "month": now.month(), "energy_wh": 12000}
                ],
                "err_code": 0
            }
        }
    })
}

// ============================================================================
// Plugs
// ============================================================================

mod plug {
    use super::*;

    #[tokio::test]
    async fn identity_and_modules() {
        let (device, _) = device(plug()).await;

        assert_eq!(device.device_type(), DeviceType::Plug);
        assert_eq!(device.alias().unwrap().as_deref(), Some("Kettle"));
        assert_eq!(device.model().unwrap(), "HS110(EU)");
        assert_eq!(device.identity().unwrap().mac.as_deref(), Some("50:C7:BF:00:00:01"));
        assert!(device.is_on().unwrap());
        assert_eq!(device.to_string(), "<Plug at 127.0.0.1 - Kettle (HS110(EU))>");

        assert!(device.module::<Emeter>().is_some());
        assert!(device.module::<Led>().is_some());
        assert!(device.module::<IotLight>().is_none());
        assert!(device.light().is_none());
    }

    #[tokio::test]
    async fn energy_readings() {
        let (device, _) = device(plug()).await;
        let energy = device.energy().unwrap();

        assert_eq!(energy.current_consumption().unwrap(), Some(1.5));
        assert_eq!(energy.voltage().unwrap(), Some(230.0));
        assert_eq!(energy.current().unwrap(), Some(0.02));
        assert_eq!(energy.consumption_total().unwrap(), Some(3.0));
        assert_eq!(energy.consumption_today().unwrap(), Some(0.5));
        assert_eq!(energy.consumption_this_month().unwrap(), Some(12.0));

        let state = device.state_information();
        assert_eq!(state.get("Current consumption"), Some(&FeatureValue::Float(1.5)));
        assert_eq!(state.get("Voltage"), Some(&FeatureValue::Float(230.0)));
    }

    #[tokio::test]
    async fn statistics_on_demand() {
        let (device, transport) = device(plug()).await;
        let energy = device.energy().unwrap();
        let today = Local::now().day();

        let days = energy.get_daystat(2024, 5).await.unwrap();
        assert_eq!(days.get(&today), Some(&0.5));
        let request = transport.last_request().unwrap();
        assert_eq!(request["emeter"]["get_daystat"], json!({"year": 2024, "month": 5}));
    }

    #[tokio::test]
    async fn power_and_led_commands() {
        let (device, transport) = device(plug()).await;

        device.turn_off().await.unwrap();
        assert_eq!(
            Value::Object(transport.last_request().unwrap()),
            json!({"system": {"set_relay_state": {"state": 0}}})
        );
        assert!(device.is_on().unwrap());

        device.feature("led").unwrap().set_value(false).await.unwrap();
        assert_eq!(
            transport.last_request().unwrap()["system"]["set_led_off"],
            json!({"off": 1})
        );
    }

    #[tokio::test]
    async fn refresh_picks_up_device_changes() {
        let (device, transport) = device(plug()).await;

        transport.modify(|fixture| {
            fixture["system"]["get_sysinfo"]["relay_state"] = json!(0);
            fixture["emeter"]["get_realtime"]["power_mw"] = json!(0);
        });
        assert!(device.is_on().unwrap());

        device.update().await.unwrap();
        assert!(!device.is_on().unwrap());
        assert_eq!(device.energy().unwrap().current_consumption().unwrap(), Some(0.0));
    }

    #[tokio::test]
    async fn rejected_command_reports_code() {
        let mut fixture = plug();
        fixture["system"]["set_relay_state"] = json!({"err_code": -3, "err_msg": "busy"});
        let (device, _) = device(fixture).await;

        assert!(matches!(
            device.turn_on().await,
            Err(Error::Device(DeviceError::CommandRejected { ref method, code: -3 }))
                if method == "system.set_relay_state"
        ));
    }

    #[tokio::test]
    async fn plug_without_meter_has_no_energy() {
        let mut info = plug_info();
        info["feature"] = json!("TIM");
        let (device, transport) = device(json!({"system": {"get_sysinfo": info}})).await;

        assert!(device.energy().is_none());
        assert!(device.feature("current_consumption").is_none());
        assert!(!transport.last_request().unwrap().contains_key("emeter"));
    }

    #[tokio::test]
    async fn retired_names_resolve() {
        let (device, _) = device(plug()).await;

        assert_eq!(device.get("is_plug").unwrap(), FeatureValue::Bool(true));
        assert_eq!(device.get("emeter_today").unwrap(), FeatureValue::Float(0.5));
        assert_eq!(device.get("led").unwrap(), FeatureValue::Bool(true));
        assert!(device.get("is_color").unwrap_err().is_unsupported());
    }
}

// ============================================================================
// Bulbs
// ============================================================================

mod bulb {
    use super::*;

    fn bulb() -> Value {
        json!({
            "system": {
                "get_sysinfo": {
                    "alias": "Lamp",
                    "model": "KL130(US)",
                    "mic_type": "IOT.SMARTBULB",
                    "deviceId": "8012B2",
                    "mic_mac": "1C3BF3000002",
                    "is_dimmable": 1,
                    "is_color": 1,
                    "is_variable_color_temp": 1,
                    "light_state": {
                        "on_off": 1,
                        "mode": "normal",
                        "hue": 120,
                        "saturation": 50,
                        "brightness": 70,
                        "color_temp": 0
                    },
                    "err_code": 0
                }
            }
        })
    }

    #[tokio::test]
    async fn light_reads_light_state() {
        let (device, _) = device(bulb()).await;
        assert_eq!(device.device_type(), DeviceType::Bulb);
        assert_eq!(device.identity().unwrap().mac.as_deref(), Some("1C3BF3000002"));

        let light = device.light().unwrap();
        assert!(light.is_color());
        assert_eq!(light.brightness().unwrap(), 70);
        assert_eq!(light.hsv().unwrap(), Hsv::new(120, 50, 70).unwrap());
        assert_eq!(
            light.valid_temperature_range().unwrap(),
            ColorTempRange::new(2500, 9000)
        );

        let state = light.state().unwrap();
        assert_eq!(state.light_on, Some(true));
        assert_eq!(state.brightness, Some(70));
        assert_eq!(state.color_temp, Some(0));
    }

    #[tokio::test]
    async fn switched_off_bulb_reports_default_state() {
        let (device, transport) = device(bulb()).await;
        transport.modify(|fixture| {
            fixture["system"]["get_sysinfo"]["light_state"] = json!({
                "on_off": 0,
                "dft_on_state": {
                    "mode": "normal",
                    "hue": 0,
                    "saturation": 0,
                    "brightness": 20,
                    "color_temp": 2700
                }
            });
        });
        device.update().await.unwrap();

        assert!(!device.is_on().unwrap());
        let light = device.light().unwrap();
        assert_eq!(light.brightness().unwrap(), 20);
        assert_eq!(light.color_temp().unwrap(), 2700);
        assert_eq!(light.state().unwrap().light_on, Some(false));
    }

    #[tokio::test]
    async fn brightness_goes_through_lighting_service() {
        let (device, transport) = device(bulb()).await;

        device
            .light()
            .unwrap()
            .set_brightness(30, Some(500))
            .await
            .unwrap();
        let request = transport.last_request().unwrap();
        let params = &request["smartlife.iot.smartbulb.lightingservice"]["transition_light_state"];
        assert_eq!(params["brightness"], 30);
        assert_eq!(params["transition_period"], 500);
        assert_eq!(params["on_off"], 1);
    }

    #[tokio::test]
    async fn temperature_outside_model_range_is_rejected() {
        let (device, transport) = device(bulb()).await;
        let sent = transport.requests().len();

        let result = device.feature("color_temperature").unwrap().set_value(2000).await;
        assert!(matches!(
            result,
            Err(Error::Value(ValueError::OutOfRange { min: 2500, max: 9000, actual: 2000 }))
        ));
        assert_eq!(transport.requests().len(), sent);
    }

    #[tokio::test]
    async fn light_state_is_validated_before_sending() {
        let (device, transport) = device(bulb()).await;
        let light = device.light().unwrap();
        let sent = transport.requests().len();

        let too_bright = LightState::default().with_brightness(250);
        assert!(matches!(
            light.set_state(&too_bright).await,
            Err(Error::Value(ValueError::OutOfRange { max: 100, actual: 250, .. }))
        ));
        let too_cold = LightState::default().with_color_temp(50000);
        assert!(matches!(
            light.set_state(&too_cold).await,
            Err(Error::Value(ValueError::OutOfRange { min: 2500, max: 9000, actual: 50000 }))
        ));
        let bad_hue = LightState {
            hue: Some(400),
            ..LightState::default()
        };
        assert!(matches!(
            light.set_state(&bad_hue).await,
            Err(Error::Value(ValueError::InvalidHue(400)))
        ));
        assert_eq!(transport.requests().len(), sent);

        let color = LightState {
            hue: Some(200),
            saturation: Some(40),
            color_temp: Some(0),
            ..LightState::default()
        };
        light.set_state(&color).await.unwrap();
        let request = transport.last_request().unwrap();
        let params = &request["smartlife.iot.smartbulb.lightingservice"]["transition_light_state"];
        assert_eq!(params["hue"], 200);
        assert_eq!(params["color_temp"], 0);
    }

    #[tokio::test]
    async fn malformed_refresh_clears_light_state() {
        let (device, transport) = device(bulb()).await;
        let light = device.light().unwrap();
        assert_eq!(light.state().unwrap().hue, Some(120));

        transport.modify(|fixture| {
            let light_state = &mut fixture["system"]["get_sysinfo"]["light_state"];
            light_state["hue"] = json!(10);
            light_state["brightness"] = json!("bad");
        });
        device.update().await.unwrap();
        assert!(matches!(
            light.state(),
            Err(Error::Device(DeviceError::UpdateRequired { .. }))
        ));

        transport.modify(|fixture| {
            fixture["system"]["get_sysinfo"]["light_state"]["brightness"] = json!(40);
        });
        device.update().await.unwrap();
        let state = light.state().unwrap();
        assert_eq!(state.hue, Some(10));
        assert_eq!(state.brightness, Some(40));
    }

    #[tokio::test]
    async fn turn_on_uses_light_method() {
        let (device, transport) = device(bulb()).await;

        device.turn_on().await.unwrap();
        assert_eq!(
            Value::Object(transport.last_request().unwrap()),
            json!({
                "smartlife.iot.smartbulb.lightingservice": {
                    "transition_light_state": {"on_off": 1, "ignore_default": 1}
                }
            })
        );
    }
}

// ============================================================================
// TCP transport
// ============================================================================

mod tcp {
    use super::*;

    /// Answers every request on one connection, returning `sysinfo` for
    /// `get_sysinfo` and success for anything else.
    async fn serve(listener: TcpListener, sysinfo: Value) {
        let (mut stream, _) = listener.accept().await.unwrap();
        loop {
            let mut header = [0u8; 4];
            if stream.read_exact(&mut header).await.is_err() {
                return;
            }
            let mut body = vec![0u8; u32::from_be_bytes(header) as usize];
            stream.read_exact(&mut body).await.unwrap();
            let request: Value = serde_json::from_slice(&decrypt(&body)).unwrap();

            let mut response = Map::new();
            for (namespace, methods) in request.as_object().unwrap() {
                let mut section = Map::new();
                for method in methods.as_object().unwrap().keys() {
                    let result = if method == "get_sysinfo" {
                        sysinfo.clone()
                    } else {
                        json!({"err_code": 0})
                    };
                    section.insert(method.clone(), result);
                }
                response.insert(namespace.clone(), Value::Object(section));
            }
            let payload = serde_json::to_vec(&response).unwrap();
            stream.write_all(&encrypt(&payload)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn connect_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut info = plug_info();
        info["feature"] = json!("TIM");
        tokio::spawn(serve(listener, info));

        let config = DeviceConfig::new("127.0.0.1").with_port(port);
        let device = Device::<Iot>::connect(config).await.unwrap();

        assert_eq!(device.alias().unwrap().as_deref(), Some("Kettle"));
        assert!(device.is_on().unwrap());
        device.turn_off().await.unwrap();
        device.update().await.unwrap();
        assert_eq!(device.snapshot().cycle(), 2);
        device.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn silent_device_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let config = DeviceConfig::new("127.0.0.1")
            .with_port(port)
            .with_timeout(Duration::from_millis(100));
        assert!(matches!(
            Device::<Iot>::connect(config).await,
            Err(Error::Transport(TransportError::Timeout(100)))
        ));
    }

    #[tokio::test]
    async fn oversized_reply_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut header = [0u8; 4];
            stream.read_exact(&mut header).await.unwrap();
            let mut body = vec![0u8; u32::from_be_bytes(header) as usize];
            stream.read_exact(&mut body).await.unwrap();
            stream.write_all(&u32::MAX.to_be_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let config = DeviceConfig::new("127.0.0.1")
            .with_port(port)
            .with_timeout(Duration::from_secs(2));
        assert!(matches!(
            Device::<Iot>::connect(config).await,
            Err(Error::Transport(TransportError::InvalidPayload(_)))
        ));
    }

    #[tokio::test]
    async fn refused_connection_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = DeviceConfig::new("127.0.0.1").with_port(port);
        assert!(matches!(
            Device::<Iot>::connect(config).await,
            Err(Error::Transport(TransportError::ConnectionFailed(_)))
        ));
    }
}
