// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status LED of structured devices.

use std::sync::Arc;

use serde_json::{Value, json};

use super::LED;
use crate::device::DeviceHandle;
use crate::error::{ParseError, Result};
use crate::feature::{Feature, FeatureMap, FeatureType, add_feature};
use crate::module::{Module, ModuleBase};
use crate::smart::{call, request};
use crate::transport::Request;
use crate::types::FeatureValue;

const LED_INFO: &str = "get_led_info";

/// Status LED, driven by a rule rather than a plain flag.
#[derive(Debug)]
pub struct SmartLed {
    base: ModuleBase,
}

impl SmartLed {
    /// Creates the module.
    #[must_use]
    pub fn new(device: DeviceHandle) -> Self {
        Self {
            base: ModuleBase::new(LED, device),
        }
    }

    /// Returns the LED rule: `always`, `never` or `auto`.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` if the last refresh delivered
    /// no LED information.
    pub fn rule(&self) -> Result<String> {
        self.base.with_data(|data| {
            data.get("led_rule")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ParseError::MissingField("led_rule".to_string()).into())
        })?
    }

    /// Returns whether the LED is enabled.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` if the last refresh delivered
    /// no LED information.
    pub fn led(&self) -> Result<bool> {
        Ok(self.rule()? != "never")
    }

    /// Enables or disables the LED.
    ///
    /// # Errors
    ///
    /// Returns the transport error or `DeviceError::CommandRejected`.
    pub async fn set_led(&self, enable: bool) -> Result<Value> {
        let rule = if enable { "always" } else { "never" };
        call(
            self.base.device(),
            "set_led_info",
            json!({ "led_rule": rule, "led_status": enable }),
        )
        .await
    }
}

impl Module for SmartLed {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        add_feature(
            features,
            Feature::builder(&self, "led", "LED")
                .kind(FeatureType::Switch)
                .icon("mdi:led")
                .getter(|m: &Self| Ok(m.led()?.into()))
                .setter(|m: Arc<Self>, value| async move { m.set_led(bool::try_from(value)?).await })
                .build(),
        )
    }

    fn query(&self) -> Request {
        request(LED_INFO, Value::Null)
    }

    fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
        match name {
            "led" => Some(self.led().map(Into::into)),
            "rule" => Some(self.rule().map(Into::into)),
            _ => None,
        }
    }
}
