// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Energy metering interface.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::feature::{Category, Feature, FeatureMap, add_feature};
use crate::module::{Deprecated, Module};
use crate::types::{EmeterStatus, FeatureValue};

/// Retired energy attribute names.
pub const ENERGY_DEPRECATED_ATTRIBUTES: &[Deprecated] = &[
    Deprecated::new("emeter_today", "consumption_today"),
    Deprecated::new("emeter_this_month", "consumption_this_month"),
    Deprecated::new("realtime", "status"),
];

/// Retired energy method names.
pub const ENERGY_DEPRECATED_METHODS: &[Deprecated] = &[
    Deprecated::new("get_realtime", "get_status"),
    Deprecated::new("erase_emeter_stats", "erase_stats"),
];

/// An energy meter.
///
/// Readings come from the last refresh cycle. `None` means the firmware does
/// not report that reading; an error means no refresh delivered data yet.
#[async_trait]
pub trait Energy: Module {
    /// Returns all readings of the last cycle.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    fn status(&self) -> Result<EmeterStatus>;

    /// Returns the current power draw in W.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    fn current_consumption(&self) -> Result<Option<f64>>;

    /// Returns today's consumption in kWh.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    fn consumption_today(&self) -> Result<Option<f64>>;

    /// Returns this month's consumption in kWh.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    fn consumption_this_month(&self) -> Result<Option<f64>>;

    /// Returns the consumption since the last reboot in kWh.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    fn consumption_total(&self) -> Result<Option<f64>>;

    /// Returns the voltage in V.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    fn voltage(&self) -> Result<Option<f64>>;

    /// Returns the current in A.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    fn current(&self) -> Result<Option<f64>>;

    /// Returns `true` if the meter reports voltage and current.
    fn has_voltage_current(&self) -> bool;

    /// Returns `true` if the meter reports consumption since reboot.
    fn has_total_consumption(&self) -> bool;

    /// Returns `true` if the meter keeps daily and monthly statistics.
    fn has_periodic_stats(&self) -> bool;

    /// Fetches live readings outside the refresh cycle.
    ///
    /// # Errors
    ///
    /// Returns the transport error or `DeviceError::CommandRejected`.
    async fn get_status(&self) -> Result<EmeterStatus>;

    /// Erases all statistics kept on the device.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UnsupportedCapability` if the meter keeps no
    /// statistics, or the transport error.
    async fn erase_stats(&self) -> Result<Value>;

    /// Fetches the daily consumption in kWh of a month, keyed by day.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UnsupportedCapability` if the meter keeps no
    /// statistics, or the transport error.
    async fn get_daystat(&self, year: i32, month: u32) -> Result<BTreeMap<u32, f64>>;

    /// Fetches the monthly consumption in kWh of a year, keyed by month.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UnsupportedCapability` if the meter keeps no
    /// statistics, or the transport error.
    async fn get_monthstat(&self, year: i32) -> Result<BTreeMap<u32, f64>>;

    /// Fetches live readings.
    ///
    /// # Errors
    ///
    /// Same as [`get_status`](Self::get_status).
    #[deprecated(note = "use `get_status` instead")]
    async fn get_realtime(&self) -> Result<EmeterStatus> {
        ENERGY_DEPRECATED_METHODS[0].warn(self.name());
        self.get_status().await
    }

    /// Erases all statistics.
    ///
    /// # Errors
    ///
    /// Same as [`erase_stats`](Self::erase_stats).
    #[deprecated(note = "use `erase_stats` instead")]
    async fn erase_emeter_stats(&self) -> Result<Value> {
        ENERGY_DEPRECATED_METHODS[1].warn(self.name());
        self.erase_stats().await
    }
}

/// Resolves the named energy attributes of `energy`.
///
/// Energy modules call this from [`Module::attribute`].
pub fn energy_attribute<E: Energy + ?Sized>(
    energy: &E,
    name: &str,
) -> Option<Result<FeatureValue>> {
    let value = match name {
        "status" => energy.status().map(Into::into),
        "current_consumption" => energy.current_consumption().map(Into::into),
        "consumption_today" => energy.consumption_today().map(Into::into),
        "consumption_this_month" => energy.consumption_this_month().map(Into::into),
        "consumption_total" => energy.consumption_total().map(Into::into),
        "voltage" => energy.voltage().map(Into::into),
        "current" => energy.current().map(Into::into),
        "has_voltage_current" => Ok(energy.has_voltage_current().into()),
        "has_total_consumption" => Ok(energy.has_total_consumption().into()),
        "has_periodic_stats" => Ok(energy.has_periodic_stats().into()),
        _ => return None,
    };
    Some(value)
}

/// Registers the standard energy features of `module`.
///
/// Consumption since reboot is only added when reported, voltage and
/// current only when measured.
///
/// # Errors
///
/// Returns `ConfigurationError::DuplicateFeature` if an id is already taken.
pub fn initialize_energy_features<E: Energy>(
    module: &Arc<E>,
    features: &mut FeatureMap,
) -> Result<()> {
    add_feature(
        features,
        Feature::builder(module, "current_consumption", "Current consumption")
            .unit("W")
            .precision(1)
            .category(Category::Primary)
            .getter(|m: &E| Ok(m.current_consumption()?.into()))
            .build(),
    )?;
    add_feature(
        features,
        Feature::builder(module, "consumption_today", "Today's consumption")
            .unit("kWh")
            .precision(3)
            .getter(|m: &E| Ok(m.consumption_today()?.into()))
            .build(),
    )?;
    add_feature(
        features,
        Feature::builder(module, "consumption_this_month", "This month's consumption")
            .unit("kWh")
            .precision(3)
            .getter(|m: &E| Ok(m.consumption_this_month()?.into()))
            .build(),
    )?;
    if module.has_total_consumption() {
        add_feature(
            features,
            Feature::builder(module, "consumption_total", "Total consumption since reboot")
                .unit("kWh")
                .precision(3)
                .getter(|m: &E| Ok(m.consumption_total()?.into()))
                .build(),
        )?;
    }
    if module.has_voltage_current() {
        add_feature(
            features,
            Feature::builder(module, "voltage", "Voltage")
                .unit("V")
                .precision(1)
                .category(Category::Primary)
                .getter(|m: &E| Ok(m.voltage()?.into()))
                .build(),
        )?;
        add_feature(
            features,
            Feature::builder(module, "current", "Current")
                .unit("A")
                .precision(2)
                .category(Category::Primary)
                .getter(|m: &E| Ok(m.current()?.into()))
                .build(),
        )?;
    }
    Ok(())
}
