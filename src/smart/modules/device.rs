// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core device information.

use std::sync::Arc;

use serde_json::{Value, json};

use super::{DEVICE, field, set_device_info};
use crate::device::DeviceHandle;
use crate::error::Result;
use crate::feature::{Category, Feature, FeatureMap, FeatureType, add_feature};
use crate::module::{Module, ModuleBase};
use crate::smart::{Components, DEVICE_INFO, request};
use crate::transport::Request;
use crate::types::FeatureValue;

/// Component version from which usage statistics are available.
const USAGE_VERSION: u32 = 2;

/// Power state, signal and usage statistics of a structured device.
#[derive(Debug)]
pub struct DeviceModule {
    base: ModuleBase,
    has_usage: bool,
}

impl DeviceModule {
    /// Creates the module for a device with the given components.
    #[must_use]
    pub fn new(device: DeviceHandle, components: &Components) -> Self {
        Self {
            base: ModuleBase::new(DEVICE, device),
            has_usage: components
                .version(DEVICE)
                .is_some_and(|version| version >= USAGE_VERSION),
        }
    }

    /// Returns `true` if the device reports usage statistics.
    #[must_use]
    pub fn has_usage(&self) -> bool {
        self.has_usage
    }

    /// Returns whether the device is on.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn is_on(&self) -> Result<bool> {
        self.base.with_info(|info| field(info, "device_on"))?
    }

    /// Returns the received signal strength in dBm.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn rssi(&self) -> Result<Option<i64>> {
        self.base.with_info(|info| info.get("rssi").and_then(Value::as_i64))
    }

    /// Returns the signal level, 0 to 3.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn signal_level(&self) -> Result<Option<i64>> {
        self.base
            .with_info(|info| info.get("signal_level").and_then(Value::as_i64))
    }

    /// Returns the network name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn ssid(&self) -> Result<Option<String>> {
        self.base
            .with_info(|info| info.get("ssid").and_then(Value::as_str).map(str::to_string))
    }

    /// Returns today's on time in minutes.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` if the last refresh delivered
    /// no usage statistics.
    pub fn on_time_today(&self) -> Result<Option<i64>> {
        self.base.with_data(|data| {
            data.pointer("/get_device_usage/time_usage/today")
                .and_then(Value::as_i64)
        })
    }

    /// Switches the device on or off.
    ///
    /// # Errors
    ///
    /// Returns the transport error or `DeviceError::CommandRejected`.
    pub async fn set_on(&self, on: bool) -> Result<Value> {
        set_device_info(self.base.device(), json!({ "device_on": on })).await
    }
}

impl Module for DeviceModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        add_feature(
            features,
            Feature::builder(&self, "state", "State")
                .kind(FeatureType::Switch)
                .category(Category::Primary)
                .getter(|m: &Self| Ok(m.is_on()?.into()))
                .setter(|m: Arc<Self>, value| async move { m.set_on(bool::try_from(value)?).await })
                .build(),
        )?;
        add_feature(
            features,
            Feature::builder(&self, "rssi", "RSSI")
                .unit("dBm")
                .category(Category::Debug)
                .icon("mdi:signal")
                .getter(|m: &Self| Ok(m.rssi()?.into()))
                .build(),
        )?;
        add_feature(
            features,
            Feature::builder(&self, "signal_level", "Signal Level")
                .icon("mdi:signal")
                .getter(|m: &Self| Ok(m.signal_level()?.into()))
                .build(),
        )?;
        add_feature(
            features,
            Feature::builder(&self, "ssid", "SSID")
                .category(Category::Debug)
                .icon("mdi:wifi")
                .getter(|m: &Self| Ok(m.ssid()?.into()))
                .build(),
        )?;
        if self.has_usage {
            add_feature(
                features,
                Feature::builder(&self, "on_time_today", "On time today")
                    .unit("min")
                    .getter(|m: &Self| Ok(m.on_time_today()?.into()))
                    .build(),
            )?;
        }
        Ok(())
    }

    fn query(&self) -> Request {
        let mut query = request(DEVICE_INFO, Value::Null);
        if self.has_usage {
            query.insert("get_device_usage".to_string(), Value::Null);
        }
        query
    }

    fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
        match name {
            "is_on" => Some(self.is_on().map(Into::into)),
            "has_usage" => Some(Ok(self.has_usage.into())),
            _ => None,
        }
    }
}
