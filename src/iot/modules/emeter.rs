// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Legacy energy meter.
//!
//! Each refresh fetches live readings plus the daily statistics of the
//! current month and the monthly statistics of the current year, from
//! which today's and this month's consumption are read.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Local};
use serde_json::{Value, json};

use super::ENERGY;
use crate::device::DeviceHandle;
use crate::error::Result;
use crate::feature::FeatureMap;
use crate::interfaces::{
    ENERGY_DEPRECATED_ATTRIBUTES, Energy, energy_attribute, initialize_energy_features,
};
use crate::iot::{self, IotCapabilities};
use crate::module::{Deprecated, Module, ModuleBase};
use crate::transport::Request;
use crate::types::{EmeterStatus, FeatureValue};

/// Namespace of plug meters.
const PLUG_NAMESPACE: &str = "emeter";
/// Namespace of bulb meters.
const BULB_NAMESPACE: &str = "smartlife.iot.common.emeter";

/// Energy meter of a legacy plug or bulb.
#[derive(Debug)]
pub struct Emeter {
    base: ModuleBase,
    namespace: &'static str,
}

impl Emeter {
    /// Creates the meter for a device with the given capabilities.
    #[must_use]
    pub fn new(device: DeviceHandle, capabilities: &IotCapabilities) -> Self {
        let namespace = if capabilities.is_light() {
            BULB_NAMESPACE
        } else {
            PLUG_NAMESPACE
        };
        Self {
            base: ModuleBase::new(ENERGY, device),
            namespace,
        }
    }

    /// Returns the namespace the meter is queried in.
    #[must_use]
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    fn section(&self, method: &str) -> Result<Value> {
        self.base
            .with_data(|data| data.get(method).cloned().unwrap_or(Value::Null))
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        iot::call(self.base.device(), self.namespace, method, params).await
    }
}

/// Reads the consumption of one statistics entry in kWh.
fn entry_kwh(entry: &Value) -> Option<f64> {
    entry
        .get("energy_wh")
        .and_then(Value::as_f64)
        .map(|wh| wh / 1000.0)
        .or_else(|| entry.get("energy").and_then(Value::as_f64))
}

/// Converts a `day_list` or `month_list` into consumption by period.
fn stats_by(list: &Value, period: &str) -> BTreeMap<u32, f64> {
    list.as_array()
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let key = entry.get(period).and_then(Value::as_u64)?;
            Some((u32::try_from(key).ok()?, entry_kwh(entry)?))
        })
        .collect()
}

impl Module for Emeter {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        initialize_energy_features(&self, features)
    }

    fn query(&self) -> Request {
        let now = Local::now();
        let mut request = Request::new();
        request.insert(
            self.namespace.to_string(),
            json!({
                "get_realtime": {},
                "get_daystat": {"year": now.year(), "month": now.month()},
                "get_monthstat": {"year": now.year()},
            }),
        );
        request
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
impl Energy for Emeter {
    fn status(&self) -> Result<EmeterStatus> {
        Ok(EmeterStatus::from_value(&self.section("get_realtime")?))
    }

    fn current_consumption(&self) -> Result<Option<f64>> {
        Ok(self.status()?.power())
    }

    fn consumption_today(&self) -> Result<Option<f64>> {
        let today = Local::now().day();
        let days = self.section("get_daystat")?;
        Ok(stats_by(&days["day_list"], "day").get(&today).copied())
    }

    fn consumption_this_month(&self) -> Result<Option<f64>> {
        let month = Local::now().month();
        let months = self.section("get_monthstat")?;
        Ok(stats_by(&months["month_list"], "month").get(&month).copied())
    }

    fn consumption_total(&self) -> Result<Option<f64>> {
        Ok(self.status()?.total())
    }

    fn voltage(&self) -> Result<Option<f64>> {
        Ok(self.status()?.voltage())
    }

    fn current(&self) -> Result<Option<f64>> {
        Ok(self.status()?.current())
    }

    fn has_voltage_current(&self) -> bool {
        true
    }

    fn has_total_consumption(&self) -> bool {
        true
    }

    fn has_periodic_stats(&self) -> bool {
        true
    }

    async fn get_status(&self) -> Result<EmeterStatus> {
        let result = self.call("get_realtime", json!({})).await?;
        Ok(EmeterStatus::from_value(&result))
    }

    async fn erase_stats(&self) -> Result<Value> {
        self.call("erase_emeter_stat", json!({})).await
    }

    async fn get_daystat(&self, year: i32, month: u32) -> Result<BTreeMap<u32, f64>> {
        let result = self
            .call("get_daystat", json!({"year": year, "month": month}))
            .await?;
        Ok(stats_by(&result["day_list"], "day"))
    }

    async fn get_monthstat(&self, year: i32) -> Result<BTreeMap<u32, f64>> {
        let result = self.call("get_monthstat", json!({ "year": year })).await?;
        Ok(stats_by(&result["month_list"], "month"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_accept_both_units() {
        let list = json!([
            {"year": 2024, "month": 5, "day": 1, "energy_wh": 1500},
            {"year": 2024, "month": 5, "day": 2, "energy": 0.25},
            {"year": 2024, "month": 5, "day": 3},
        ]);
        let stats = stats_by(&list, "day");
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[&1], 1.5);
        assert_eq!(stats[&2], 0.25);
    }

    #[test]
    fn namespace_follows_device_kind() {
        let plug = crate::iot::IotCapabilitiesBuilder::new(crate::types::DeviceType::Plug).build();
        let bulb = crate::iot::IotCapabilitiesBuilder::new(crate::types::DeviceType::Bulb).build();
        assert_eq!(Emeter::new(DeviceHandle::detached(), &plug).namespace(), "emeter");
        assert_eq!(
            Emeter::new(DeviceHandle::detached(), &bulb).namespace(),
            "smartlife.iot.common.emeter"
        );
    }

    #[test]
    fn query_fetches_readings_and_statistics() {
        let plug = crate::iot::IotCapabilitiesBuilder::new(crate::types::DeviceType::Plug).build();
        let query = Emeter::new(DeviceHandle::detached(), &plug).query();
        let methods = query["emeter"].as_object().unwrap();
        assert!(methods.contains_key("get_realtime"));
        assert!(methods.contains_key("get_daystat"));
        assert!(methods.contains_key("get_monthstat"));
    }
}
