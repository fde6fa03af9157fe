// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Energy meter of structured plugs.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::ENERGY;
use crate::device::DeviceHandle;
use crate::error::{DeviceError, Result};
use crate::feature::FeatureMap;
use crate::interfaces::{
    ENERGY_DEPRECATED_ATTRIBUTES, Energy, energy_attribute, initialize_energy_features,
};
use crate::module::{Deprecated, Module, ModuleBase};
use crate::smart::{self, Components};
use crate::transport::Request;
use crate::types::{EmeterStatus, FeatureValue};

const COMPONENT: &str = "energy_monitoring";
const ENERGY_USAGE: &str = "get_energy_usage";
const CURRENT_POWER: &str = "get_current_power";
const EMETER_DATA: &str = "get_emeter_data";

/// Component version from which voltage and current are reported.
const EMETER_DATA_VERSION: u32 = 2;

/// Energy meter of a structured plug.
///
/// Consumption comes from `get_energy_usage` in Wh; live power from
/// `get_current_power` in W when the firmware supports it. Newer firmware
/// also reports voltage and current through `get_emeter_data`.
#[derive(Debug)]
pub struct SmartEnergy {
    base: ModuleBase,
    has_emeter_data: bool,
}

impl SmartEnergy {
    /// Creates the meter for a device with the given components.
    #[must_use]
    pub fn new(device: DeviceHandle, components: &Components) -> Self {
        Self {
            base: ModuleBase::new(ENERGY, device),
            has_emeter_data: components
                .version(COMPONENT)
                .is_some_and(|version| version >= EMETER_DATA_VERSION),
        }
    }

    fn section(&self, method: &str) -> Result<Value> {
        self.base
            .with_data(|data| data.get(method).cloned().unwrap_or(Value::Null))
    }

    fn usage_kwh(&self, key: &str) -> Result<Option<f64>> {
        Ok(self
            .section(ENERGY_USAGE)?
            .get(key)
            .and_then(Value::as_f64)
            .map(|wh| wh / 1000.0))
    }
}

impl Module for SmartEnergy {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        initialize_energy_features(&self, features)
    }

    fn query(&self) -> Request {
        let mut query = smart::request(ENERGY_USAGE, Value::Null);
        query.insert(CURRENT_POWER.to_string(), Value::Null);
        if self.has_emeter_data {
            query.insert(EMETER_DATA.to_string(), Value::Null);
        }
        query
    }

    fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
        energy_attribute(self, name)
    }

    fn deprecated_attributes(&self) -> &'static [Deprecated] {
        ENERGY_DEPRECATED_ATTRIBUTES
    }

    fn as_energy(self: Arc<Self>) -> Option<Arc<dyn Energy>> {
        Some(self)
    }
}

#[async_trait]
impl Energy for SmartEnergy {
    fn status(&self) -> Result<EmeterStatus> {
        if self.has_emeter_data {
            let data = self.section(EMETER_DATA)?;
            if data.is_object() {
                return Ok(EmeterStatus::from_value(&data));
            }
        }
        let mut readings = Map::new();
        if let Some(power) = self.current_consumption()? {
            readings.insert("power".to_string(), json!(power));
        }
        if let Some(today) = self.section(ENERGY_USAGE)?.get("today_energy") {
            readings.insert("energy_wh".to_string(), today.clone());
        }
        Ok(EmeterStatus::new(readings))
    }

    fn current_consumption(&self) -> Result<Option<f64>> {
        if let Some(watts) = self
            .section(CURRENT_POWER)?
            .get("current_power")
            .and_then(Value::as_f64)
        {
            return Ok(Some(watts));
        }
        Ok(self
            .section(ENERGY_USAGE)?
            .get("current_power")
            .and_then(Value::as_f64)
            .map(|mw| mw / 1000.0))
    }

    fn consumption_today(&self) -> Result<Option<f64>> {
        self.usage_kwh("today_energy")
    }

    fn consumption_this_month(&self) -> Result<Option<f64>> {
        self.usage_kwh("month_energy")
    }

    fn consumption_total(&self) -> Result<Option<f64>> {
        Ok(None)
    }

    fn voltage(&self) -> Result<Option<f64>> {
        Ok(EmeterStatus::from_value(&self.section(EMETER_DATA)?).voltage())
    }

    fn current(&self) -> Result<Option<f64>> {
        Ok(EmeterStatus::from_value(&self.section(EMETER_DATA)?).current())
    }

    fn has_voltage_current(&self) -> bool {
        self.has_emeter_data
    }

    fn has_total_consumption(&self) -> bool {
        false
    }

    fn has_periodic_stats(&self) -> bool {
        false
    }

    async fn get_status(&self) -> Result<EmeterStatus> {
        let method = if self.has_emeter_data {
            EMETER_DATA
        } else {
            ENERGY_USAGE
        };
        let result = smart::call(self.base.device(), method, Value::Null).await?;
        Ok(EmeterStatus::from_value(&result))
    }

    async fn erase_stats(&self) -> Result<Value> {
        Err(DeviceError::unsupported("erasing energy statistics").into())
    }

    async fn get_daystat(&self, _year: i32, _month: u32) -> Result<BTreeMap<u32, f64>> {
        Err(DeviceError::unsupported("daily energy statistics").into())
    }

    async fn get_monthstat(&self, _year: i32) -> Result<BTreeMap<u32, f64>> {
        Err(DeviceError::unsupported("monthly energy statistics").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_grows_with_component_version() {
        let v1 = SmartEnergy::new(
            DeviceHandle::detached(),
            &Components::new().with(COMPONENT, 1),
        );
        let v2 = SmartEnergy::new(
            DeviceHandle::detached(),
            &Components::new().with(COMPONENT, 2),
        );
        assert_eq!(v1.query().len(), 2);
        assert!(!v1.has_voltage_current());
        assert!(v2.query().contains_key(EMETER_DATA));
        assert!(v2.has_voltage_current());
    }

    #[tokio::test]
    async fn periodic_statistics_are_unsupported() {
        let energy = SmartEnergy::new(DeviceHandle::detached(), &Components::new());
        assert!(energy.get_daystat(2024, 1).await.unwrap_err().is_unsupported());
        assert!(energy.erase_stats().await.unwrap_err().is_unsupported());
    }
}
