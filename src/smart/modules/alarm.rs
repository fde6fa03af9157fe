// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Siren of hubs.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::{ALARM, field};
use crate::device::DeviceHandle;
use crate::error::{ParseError, Result, ValueError};
use crate::feature::{Category, Feature, FeatureMap, FeatureType, add_feature};
use crate::module::{Module, ModuleBase};
use crate::smart::{call, request};
use crate::transport::Request;
use crate::types::FeatureValue;

/// Volumes accepted by the siren.
pub const ALARM_VOLUMES: &[&str] = &["low", "normal", "high"];

const CONFIGURE: &str = "get_alarm_configure";
const SOUNDS: &str = "get_support_alarm_type_list";

/// Alarm configuration and playback.
#[derive(Debug)]
pub struct Alarm {
    base: ModuleBase,
}

impl Alarm {
    /// Creates the module.
    #[must_use]
    pub fn new(device: DeviceHandle) -> Self {
        Self {
            base: ModuleBase::new(ALARM, device),
        }
    }

    fn configuration<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.base.with_data(|data| {
            let configure = data
                .get(CONFIGURE)
                .ok_or_else(|| ParseError::MissingField(CONFIGURE.to_string()))?;
            field(configure, key)
        })?
    }

    fn configure_params(&self) -> Result<Map<String, Value>> {
        Ok(Map::from_iter([
            ("type".to_string(), self.alarm_sound()?.into()),
            ("volume".to_string(), self.alarm_volume()?.into()),
            ("duration".to_string(), self.alarm_duration()?.into()),
        ]))
    }

    async fn configure(&self, key: &str, value: Value) -> Result<Value> {
        let mut params = self.configure_params()?;
        params.insert(key.to_string(), value);
        call(self.base.device(), "set_alarm_configure", Value::Object(params)).await
    }

    /// Returns `true` while the siren is sounding.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn active(&self) -> Result<bool> {
        self.base.with_info(|info| field(info, "in_alarm"))?
    }

    /// Returns what triggered the alarm, if anything.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn source(&self) -> Result<Option<String>> {
        self.base.with_info(|info| {
            info.get("in_alarm_source")
                .and_then(Value::as_str)
                .filter(|source| !source.is_empty())
                .map(str::to_string)
        })
    }

    /// Returns the configured sound.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` if the last refresh delivered
    /// no alarm configuration.
    pub fn alarm_sound(&self) -> Result<String> {
        self.configuration("type")
    }

    /// Returns the configured volume.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` if the last refresh delivered
    /// no alarm configuration.
    pub fn alarm_volume(&self) -> Result<String> {
        self.configuration("volume")
    }

    /// Returns the configured duration in seconds.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` if the last refresh delivered
    /// no alarm configuration.
    pub fn alarm_duration(&self) -> Result<i64> {
        self.configuration("duration")
    }

    /// Returns the sounds the siren can play.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` if the last refresh delivered
    /// no sound list.
    pub fn alarm_sounds(&self) -> Result<Vec<String>> {
        self.base.with_data(|data| {
            let sounds = data
                .get(SOUNDS)
                .ok_or_else(|| ParseError::MissingField(SOUNDS.to_string()))?;
            field(sounds, "alarm_type_list")
        })?
    }

    /// Sets the configured sound.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidChoice` for unknown sounds, or the
    /// transport error.
    pub async fn set_alarm_sound(&self, sound: &str) -> Result<Value> {
        check_choice(sound, self.alarm_sounds()?)?;
        self.configure("type", sound.into()).await
    }

    /// Sets the configured volume.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidChoice` for unknown volumes, or the
    /// transport error.
    pub async fn set_alarm_volume(&self, volume: &str) -> Result<Value> {
        check_volume(volume)?;
        self.configure("volume", volume.into()).await
    }

    /// Sets the configured duration in seconds.
    ///
    /// # Errors
    ///
    /// Returns the transport error or `DeviceError::CommandRejected`.
    pub async fn set_alarm_duration(&self, seconds: i64) -> Result<Value> {
        self.configure("duration", seconds.into()).await
    }

    /// Starts the siren, overriding the configuration where given.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidChoice` for unknown volumes, or the
    /// transport error.
    pub async fn play(
        &self,
        sound: Option<&str>,
        volume: Option<&str>,
        duration: Option<i64>,
    ) -> Result<Value> {
        let mut params = Map::new();
        if let Some(sound) = sound {
            params.insert("alarm_type".into(), sound.into());
        }
        if let Some(volume) = volume {
            check_volume(volume)?;
            params.insert("alarm_volume".into(), volume.into());
        }
        if let Some(duration) = duration {
            params.insert("alarm_duration".into(), duration.into());
        }
        call(self.base.device(), "play_alarm", Value::Object(params)).await
    }

    /// Stops the siren.
    ///
    /// # Errors
    ///
    /// Returns the transport error or `DeviceError::CommandRejected`.
    pub async fn stop(&self) -> Result<Value> {
        call(self.base.device(), "stop_alarm", Value::Null).await
    }
}

fn check_choice(value: &str, choices: Vec<String>) -> Result<()> {
    if choices.iter().any(|choice| choice == value) {
        return Ok(());
    }
    Err(ValueError::InvalidChoice {
        value: value.to_string(),
        choices,
    }
    .into())
}

fn check_volume(volume: &str) -> Result<()> {
    check_choice(volume, ALARM_VOLUMES.iter().map(ToString::to_string).collect())
}

impl Module for Alarm {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        add_feature(
            features,
            Feature::builder(&self, "alarm", "Alarm")
                .kind(FeatureType::BinarySensor)
                .icon("mdi:alarm")
                .getter(|m: &Self| Ok(m.active()?.into()))
                .build(),
        )?;
        add_feature(
            features,
            Feature::builder(&self, "alarm_source", "Alarm source")
                .category(Category::Debug)
                .icon("mdi:bell")
                .getter(|m: &Self| Ok(m.source()?.into()))
                .build(),
        )?;
        add_feature(
            features,
            Feature::builder(&self, "alarm_sound", "Alarm sound")
                .kind(FeatureType::Choice)
                .category(Category::Config)
                .choices(Self::alarm_sounds)
                .getter(|m: &Self| Ok(m.alarm_sound()?.into()))
                .setter(|m: Arc<Self>, value| async move {
                    m.set_alarm_sound(&String::try_from(value)?).await
                })
                .build(),
        )?;
        add_feature(
            features,
            Feature::builder(&self, "alarm_volume", "Alarm volume")
                .kind(FeatureType::Choice)
                .category(Category::Config)
                .icon("mdi:volume-high")
                .choices(|_: &Self| Ok(ALARM_VOLUMES.iter().map(ToString::to_string).collect()))
                .getter(|m: &Self| Ok(m.alarm_volume()?.into()))
                .setter(|m: Arc<Self>, value| async move {
                    m.set_alarm_volume(&String::try_from(value)?).await
                })
                .build(),
        )?;
        add_feature(
            features,
            Feature::builder(&self, "alarm_duration", "Alarm duration")
                .kind(FeatureType::Number)
                .category(Category::Config)
                .unit("s")
                .fixed_range(0, 10_000)
                .getter(|m: &Self| Ok(m.alarm_duration()?.into()))
                .setter(|m: Arc<Self>, value| async move {
                    m.set_alarm_duration(i64::try_from(value)?).await
                })
                .build(),
        )?;
        add_feature(
            features,
            Feature::builder(&self, "test_alarm", "Test alarm")
                .action(|m: Arc<Self>| async move { m.play(None, None, None).await })
                .build(),
        )?;
        add_feature(
            features,
            Feature::builder(&self, "stop_alarm", "Stop alarm")
                .action(|m: Arc<Self>| async move { m.stop().await })
                .build(),
        )
    }

    fn query(&self) -> Request {
        let mut query = request(CONFIGURE, Value::Null);
        query.insert(SOUNDS.to_string(), Value::Null);
        query
    }

    fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
        match name {
            "active" => Some(self.active().map(Into::into)),
            "source" => Some(self.source().map(Into::into)),
            "alarm_sounds" => Some(self.alarm_sounds().map(Into::into)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn query_requests_configuration_and_sounds() {
        let alarm = Alarm::new(DeviceHandle::detached());
        let query = alarm.query();
        assert_eq!(query.get(CONFIGURE), Some(&json!(null)));
        assert!(query.contains_key(SOUNDS));
    }

    #[tokio::test]
    async fn unknown_volume_is_rejected_before_sending() {
        let alarm = Alarm::new(DeviceHandle::detached());
        assert!(matches!(
            alarm.play(None, Some("deafening"), None).await,
            Err(crate::Error::Value(_))
        ));
    }
}
