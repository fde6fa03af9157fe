// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the modules of structured devices.

use std::sync::Arc;

use kasalink::smart::Smart;
use kasalink::smart::modules::{Alarm, Fan, MotionSensor, SmartLed, SmartLight};
use kasalink::transport::MemoryTransport;
use kasalink::types::{DeviceType, Hsv, LightState};
use kasalink::{
    Device, DeviceConfig, DeviceError, Error, FeatureValue, ProtocolFamily, ValueError,
};
use serde_json::{Value, json};

async fn device(fixture: Value) -> (Device<Smart>, Arc<MemoryTransport>) {
    let transport = Arc::new(MemoryTransport::new(ProtocolFamily::Smart, fixture));
    let device = Device::<Smart>::builder(DeviceConfig::new("192.168.1.30"), transport.clone())
        .build()
        .await
        .unwrap();
    (device, transport)
}

fn components(ids: &[(&str, u32)]) -> Value {
    let list: Vec<Value> = ids
        .iter()
        .map(|(id, version)| json!({"id": id, "ver_code": version}))
        .collect();
    json!({ "component_list": list })
}

// ============================================================================
// Lights
// ============================================================================

mod light {
    use super::*;

    fn bulb() -> Value {
        json!({
            "component_nego": components(&[
                ("device", 2),
                ("brightness", 1),
                ("color", 1),
                ("color_temperature", 1),
                ("led", 1),
            ]),
            "get_device_info": {
                "device_id": "8022A1",
                "model": "L530",
                "type": "SMART.TAPOBULB",
                "nickname": "TGl2aW5nIHJvb20=",
                "ssid": "aG9tZQ==",
                "rssi": -52,
                "signal_level": 2,
                "device_on": true,
                "brightness": 60,
                "hue": 120,
                "saturation": 80,
                "color_temp": 0,
                "color_temp_range": [2500, 6500]
            },
            "get_device_usage": {"time_usage": {"today": 30, "past7": 200}},
            "get_led_info": {"led_rule": "always", "led_status": true}
        })
    }

    #[tokio::test]
    async fn composite_light_reads_sibling_modules() {
        let (device, _) = device(bulb()).await;
        assert_eq!(device.device_type(), DeviceType::Bulb);
        assert_eq!(device.alias().unwrap().as_deref(), Some("Living room"));

        let light = device.light().unwrap();
        assert!(light.is_dimmable());
        assert!(light.is_color());
        assert!(light.is_variable_color_temp());
        assert!(!light.has_effects());
        assert_eq!(light.brightness().unwrap(), 60);
        assert_eq!(light.hsv().unwrap(), Hsv::new(120, 80, 60).unwrap());

        let state = light.state().unwrap();
        assert_eq!(state.light_on, Some(true));
        assert_eq!(state.brightness, Some(60));
        assert_eq!(state.hue, Some(120));
        assert_eq!(state.saturation, Some(80));
        assert_eq!(state.color_temp, Some(0));

        assert!(device.module::<SmartLight>().is_some());
    }

    #[tokio::test]
    async fn brightness_zero_switches_off() {
        let (device, transport) = device(bulb()).await;
        let light = device.light().unwrap();

        light.set_brightness(0, None).await.unwrap();
        assert_eq!(
            transport.last_request().unwrap()["set_device_info"],
            json!({"device_on": false})
        );

        device.update().await.unwrap();
        assert!(!device.is_on().unwrap());
        let state = light.state().unwrap();
        assert_eq!(state.light_on, Some(false));
        assert_eq!(state.brightness, None);
    }

    #[tokio::test]
    async fn out_of_range_values_are_not_sent() {
        let (device, transport) = device(bulb()).await;
        let light = device.light().unwrap();
        let sent = transport.requests().len();

        assert!(matches!(
            light.set_color_temp(9000, None).await,
            Err(Error::Value(ValueError::OutOfRange { min: 2500, max: 6500, actual: 9000 }))
        ));
        assert!(matches!(
            light.set_brightness(101, None).await,
            Err(Error::Value(ValueError::OutOfRange { .. }))
        ));
        assert_eq!(transport.requests().len(), sent);
    }

    #[tokio::test]
    async fn light_state_is_validated_before_sending() {
        let (device, transport) = device(bulb()).await;
        let light = device.light().unwrap();
        let sent = transport.requests().len();

        let bad_hue = LightState {
            hue: Some(400),
            ..LightState::default()
        };
        assert!(matches!(
            light.set_state(&bad_hue).await,
            Err(Error::Value(ValueError::InvalidHue(400)))
        ));
        let bad_saturation = LightState {
            saturation: Some(150),
            ..LightState::default()
        };
        assert!(matches!(
            light.set_state(&bad_saturation).await,
            Err(Error::Value(ValueError::InvalidSaturation(150)))
        ));
        let too_warm = LightState::default().with_color_temp(1000);
        assert!(matches!(
            light.set_state(&too_warm).await,
            Err(Error::Value(ValueError::OutOfRange { min: 2500, max: 6500, actual: 1000 }))
        ));
        assert_eq!(transport.requests().len(), sent);

        let white = LightState::default().with_brightness(30).with_color_temp(4000);
        light.set_state(&white).await.unwrap();
        assert_eq!(
            transport.last_request().unwrap()["set_device_info"],
            json!({"brightness": 30, "color_temp": 4000, "device_on": true})
        );
    }

    #[tokio::test]
    async fn malformed_refresh_clears_light_state() {
        let (device, transport) = device(bulb()).await;
        let light = device.light().unwrap();
        assert_eq!(light.state().unwrap().hue, Some(120));

        transport.modify(|fixture| {
            fixture["get_device_info"]["brightness"] = json!(20);
            fixture["get_device_info"]["hue"] = json!("bad");
        });
        device.update().await.unwrap();
        assert!(matches!(
            light.state(),
            Err(Error::Device(DeviceError::UpdateRequired { .. }))
        ));
        assert_eq!(light.brightness().unwrap(), 20);
    }

    #[tokio::test]
    async fn features_expose_ranges() {
        let (device, _) = device(bulb()).await;

        let temperature = device.feature("color_temperature").unwrap();
        assert_eq!(temperature.range().unwrap(), Some((2500, 6500)));
        assert_eq!(temperature.unit(), Some("K"));

        let brightness = device.feature("brightness").unwrap();
        assert_eq!(brightness.range().unwrap(), Some((0, 100)));
        assert_eq!(brightness.value().unwrap(), FeatureValue::Int(60));
    }

    #[tokio::test]
    async fn hsv_feature_writes_color() {
        let (device, _) = device(bulb()).await;
        let hsv = Hsv::new(240, 100, 50).unwrap();

        device.feature("hsv").unwrap().set_value(hsv).await.unwrap();
        device.update().await.unwrap();

        assert_eq!(device.light().unwrap().hsv().unwrap(), hsv);
    }

    #[tokio::test]
    async fn device_module_reads_signal_and_usage() {
        let (device, _) = device(bulb()).await;

        assert_eq!(
            device.feature("ssid").unwrap().value().unwrap(),
            FeatureValue::from("home")
        );
        assert_eq!(
            device.feature("rssi").unwrap().value().unwrap(),
            FeatureValue::Int(-52)
        );
        assert_eq!(
            device.feature("on_time_today").unwrap().value().unwrap(),
            FeatureValue::Int(30)
        );
    }

    #[tokio::test]
    async fn led_follows_rule() {
        let (device, _) = device(bulb()).await;
        let led = device.module::<SmartLed>().unwrap();
        assert!(led.led().unwrap());

        device.feature("led").unwrap().set_value(false).await.unwrap();
        assert!(led.led().unwrap());

        device.update().await.unwrap();
        assert!(!led.led().unwrap());
        assert_eq!(led.rule().unwrap(), "never");
    }

    #[tokio::test]
    async fn retired_light_names_resolve() {
        let (device, _) = device(bulb()).await;
        assert_eq!(device.get("brightness").unwrap(), FeatureValue::Int(60));
        assert_eq!(device.get("is_color").unwrap(), FeatureValue::Bool(true));
        assert_eq!(device.get("led").unwrap(), FeatureValue::Bool(true));
    }
}

// ============================================================================
// Energy
// ============================================================================

mod energy {
    use super::*;

    fn plug() -> Value {
        json!({
            "component_nego": components(&[("device", 1), ("energy_monitoring", 1)]),
            "get_device_info": {
                "model": "P110",
                "type": "SMART.TAPOPLUG",
                "device_on": true
            },
            "get_energy_usage": {
                "today_energy": 1200,
                "month_energy": 35000,
                "current_power": 12500
            },
            "get_current_power": {"current_power": 12}
        })
    }

    #[tokio::test]
    async fn readings_come_from_usage_and_power() {
        let (device, _) = device(plug()).await;
        let energy = device.energy().unwrap();

        assert_eq!(energy.current_consumption().unwrap(), Some(12.0));
        assert_eq!(energy.consumption_today().unwrap(), Some(1.2));
        assert_eq!(energy.consumption_this_month().unwrap(), Some(35.0));
        assert_eq!(energy.voltage().unwrap(), None);
        assert!(!energy.has_voltage_current());
        assert!(device.feature("voltage").is_none());
    }

    #[tokio::test]
    async fn power_falls_back_to_usage() {
        let mut fixture = plug();
        fixture.as_object_mut().unwrap().remove("get_current_power");
        let (device, _) = device(fixture).await;

        assert_eq!(
            device.feature("current_consumption").unwrap().value().unwrap(),
            FeatureValue::Float(12.5)
        );
    }

    #[tokio::test]
    async fn periodic_statistics_are_unsupported() {
        let (device, _) = device(plug()).await;
        let energy = device.energy().unwrap();

        assert!(energy.get_daystat(2024, 5).await.unwrap_err().is_unsupported());
        assert!(energy.get_monthstat(2024).await.unwrap_err().is_unsupported());
    }

    #[tokio::test]
    async fn retired_energy_names_resolve() {
        let (device, _) = device(plug()).await;
        assert_eq!(device.get("emeter_today").unwrap(), FeatureValue::Float(1.2));
        assert_eq!(
            device.module_by_name("energy").unwrap().get("emeter_this_month").unwrap(),
            FeatureValue::Float(35.0)
        );
    }
}

// ============================================================================
// Fans, hubs and sensors
// ============================================================================

mod others {
    use super::*;

    #[tokio::test]
    async fn fan_speed_and_sleep_mode() {
        let (device, transport) = device(json!({
            "component_nego": components(&[("device", 1), ("fan_control", 1)]),
            "get_device_info": {
                "model": "KS240",
                "type": "SMART.KASASWITCH",
                "device_on": true,
                "fan_speed_level": 2,
                "fan_sleep_mode_on": false
            }
        }))
        .await;
        assert_eq!(device.device_type(), DeviceType::Fan);

        let speed = device.feature("fan_speed_level").unwrap();
        assert_eq!(speed.value().unwrap(), FeatureValue::Int(2));
        assert_eq!(speed.range().unwrap(), Some((0, 4)));

        speed.set_value(4).await.unwrap();
        assert_eq!(
            transport.last_request().unwrap()["set_device_info"],
            json!({"device_on": true, "fan_speed_level": 4})
        );
        assert!(matches!(
            speed.set_value(5).await,
            Err(Error::Value(ValueError::OutOfRange { actual: 5, .. }))
        ));

        speed.set_value(0).await.unwrap();
        device.update().await.unwrap();
        assert_eq!(device.module::<Fan>().unwrap().fan_speed_level().unwrap(), 0);
    }

    fn hub() -> Value {
        json!({
            "component_nego": components(&[("device", 1), ("alarm", 1)]),
            "get_device_info": {
                "model": "H100",
                "type": "SMART.TAPOHUB",
                "device_on": true,
                "in_alarm": false,
                "in_alarm_source": ""
            },
            "get_alarm_configure": {
                "type": "Doorbell Ring 1",
                "volume": "normal",
                "duration": 300
            },
            "get_support_alarm_type_list": {
                "alarm_type_list": ["Doorbell Ring 1", "Alarm 1", "Siren"]
            }
        })
    }

    #[tokio::test]
    async fn alarm_configuration() {
        let (device, transport) = device(hub()).await;
        let alarm = device.module::<Alarm>().unwrap();

        assert!(!alarm.active().unwrap());
        assert_eq!(alarm.source().unwrap(), None);
        assert_eq!(alarm.alarm_volume().unwrap(), "normal");
        assert_eq!(alarm.alarm_duration().unwrap(), 300);

        let sound = device.feature("alarm_sound").unwrap();
        assert_eq!(
            sound.choices().unwrap().unwrap(),
            vec!["Doorbell Ring 1", "Alarm 1", "Siren"]
        );
        sound.set_value("Siren").await.unwrap();
        assert_eq!(
            transport.last_request().unwrap()["set_alarm_configure"],
            json!({"type": "Siren", "volume": "normal", "duration": 300})
        );
        assert!(matches!(
            sound.set_value("Foghorn").await,
            Err(Error::Value(ValueError::InvalidChoice { .. }))
        ));

        device.update().await.unwrap();
        assert_eq!(alarm.alarm_sound().unwrap(), "Siren");
    }

    #[tokio::test]
    async fn alarm_actions() {
        let (device, transport) = device(hub()).await;

        device.feature("test_alarm").unwrap().set_value(true).await.unwrap();
        assert!(transport.last_request().unwrap().contains_key("play_alarm"));

        device.feature("stop_alarm").unwrap().set_value(true).await.unwrap();
        assert!(transport.last_request().unwrap().contains_key("stop_alarm"));
    }

    #[tokio::test]
    async fn motion_sensor_admitted_by_info_key() {
        let (device, _) = device(json!({
            "component_nego": components(&[("device", 1)]),
            "get_device_info": {
                "model": "T100",
                "type": "SMART.TAPOSENSOR",
                "device_on": true,
                "detected": true
            }
        }))
        .await;

        assert!(device.module::<MotionSensor>().is_some());
        assert_eq!(
            device.feature("motion_detected").unwrap().value().unwrap(),
            FeatureValue::Bool(true)
        );
        assert!(device.module::<Alarm>().is_none());
    }
}
