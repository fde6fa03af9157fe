// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The module contract shared by both protocol families.
//!
//! A module is one unit of device functionality (energy metering, light
//! control, a motion sensor). It is bound to exactly one device, declares
//! the data it needs from each refresh cycle through [`Module::query`],
//! reads the slice of the response routed back to it through its
//! [`ModuleBase`], and registers its user-facing [`Feature`]s once.
//!
//! Modules never perform the refresh round trip themselves. The
//! [`ModuleRegistry`] collects their queries, routes the response back and
//! then runs every [`Module::post_update`] hook.
//!
//! [`Feature`]: crate::Feature

mod deprecated;
mod registry;

pub use deprecated::{DEPRECATION_TARGET, Deprecated};
pub use registry::{CyclePhase, ModuleRegistry, ModuleSet, merge_fragment};

pub(crate) use registry::route_by_keys;

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::device::DeviceHandle;
use crate::error::{ConfigurationError, DeviceError, Error, Result};
use crate::feature::FeatureMap;
use crate::interfaces::{Energy, Light, LightEffect};
use crate::transport::Request;
use crate::types::FeatureValue;

static NO_FEATURES: FeatureMap = FeatureMap::new();

/// Conversion of a shared module into a shared `Any`, used for typed lookups.
pub trait AsAny: Any + Send + Sync {
    /// Converts the shared module into a shared `Any`.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A composable unit of device functionality bound to one device.
///
/// Only [`base`](Module::base) is required; every other method has a
/// default suitable for a module that just reads the device info block.
pub trait Module: AsAny + fmt::Debug {
    /// Returns the shared module state.
    fn base(&self) -> &ModuleBase;

    /// Returns the module name, unique within a device.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// Registers the features of this module.
    ///
    /// Called exactly once, after admission and before any feature is read.
    /// Optional features may be skipped based on device capabilities.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::DuplicateFeature` if two features share
    /// an id.
    fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
        let _ = features;
        Ok(())
    }

    /// Returns the request fragment this module needs on every cycle.
    ///
    /// Must be free of side effects. An empty fragment is valid for modules
    /// reading the device info block.
    fn query(&self) -> Request {
        Request::new()
    }

    /// Recomputes derived state once every module has received its data.
    ///
    /// Must not perform network requests.
    ///
    /// # Errors
    ///
    /// Errors are logged by the registry and do not abort the cycle.
    fn post_update(&self, modules: &ModuleSet) -> Result<()> {
        let _ = modules;
        Ok(())
    }

    /// Resolves a named attribute that is not a feature.
    ///
    /// Returns `None` for unknown names.
    fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
        let _ = name;
        None
    }

    /// Returns the retired attribute names of this module.
    fn deprecated_attributes(&self) -> &'static [Deprecated] {
        &[]
    }

    /// Returns the features registered by this module.
    fn features(&self) -> &FeatureMap {
        self.base().features()
    }

    /// Looks up an attribute or feature value by name.
    ///
    /// Retired names resolve to their replacement and emit one deprecation
    /// warning per access.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingAttribute` for names that are neither known
    /// nor deprecated, or the error of the resolved accessor.
    fn get(&self, name: &str) -> Result<FeatureValue> {
        if let Some(value) = resolve(self, name) {
            return value;
        }
        if let Some(alias) = Deprecated::find(self.deprecated_attributes(), name) {
            alias.warn(self.name());
            if let Some(value) = resolve(self, alias.replacement) {
                return value;
            }
        }
        Err(Error::MissingAttribute {
            owner: self.name().to_string(),
            name: name.to_string(),
        })
    }

    /// Returns this module as an energy meter, if it is one.
    fn as_energy(self: Arc<Self>) -> Option<Arc<dyn Energy>> {
        None
    }

    /// Returns this module as a light, if it is one.
    fn as_light(self: Arc<Self>) -> Option<Arc<dyn Light>> {
        None
    }

    /// Returns this module as a light effect controller, if it is one.
    fn as_light_effect(self: Arc<Self>) -> Option<Arc<dyn LightEffect>> {
        None
    }
}

fn resolve<M: Module + ?Sized>(module: &M, name: &str) -> Option<Result<FeatureValue>> {
    module
        .attribute(name)
        .or_else(|| module.features().get(name).map(|feature| feature.value()))
}

/// State shared by every module: its name, its device and its features.
pub struct ModuleBase {
    name: String,
    device: DeviceHandle,
    features: OnceLock<FeatureMap>,
}

impl ModuleBase {
    /// Creates the base of a module bound to `device`.
    #[must_use]
    pub fn new(name: impl Into<String>, device: DeviceHandle) -> Self {
        Self {
            name: name.into(),
            device,
            features: OnceLock::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn detached(name: &str) -> Self {
        Self::new(name, DeviceHandle::detached())
    }

    /// Returns the module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the handle of the owning device.
    #[must_use]
    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    /// Returns the registered features, empty before initialization.
    #[must_use]
    pub fn features(&self) -> &FeatureMap {
        self.features.get().unwrap_or(&NO_FEATURES)
    }

    /// Returns `true` once features have been registered.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.features.get().is_some()
    }

    pub(crate) fn install_features(&self, features: FeatureMap) -> Result<()> {
        self.features
            .set(features)
            .map_err(|_| ConfigurationError::AlreadyInitialized(self.name.clone()).into())
    }

    /// Runs `read` on this module's slice of the last response.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` if the last cycle delivered no
    /// data to this module.
    pub fn with_data<T>(&self, read: impl FnOnce(&Value) -> T) -> Result<T> {
        let snapshot = self.device.snapshot()?;
        let data = snapshot
            .slice(&self.name)
            .ok_or_else(|| DeviceError::update_required(&self.name))?;
        Ok(read(data))
    }

    /// Runs `read` on the device info block of the last response.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh.
    pub fn with_info<T>(&self, read: impl FnOnce(&Value) -> T) -> Result<T> {
        let snapshot = self.device.snapshot()?;
        Ok(read(snapshot.info()?))
    }
}

impl fmt::Debug for ModuleBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleBase")
            .field("name", &self.name)
            .field("features", &self.features().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Runs the one-time feature initialization of `module`.
pub(crate) fn initialize(module: &Arc<dyn Module>) -> Result<()> {
    if module.base().is_initialized() {
        return Err(ConfigurationError::AlreadyInitialized(module.name().to_string()).into());
    }
    let mut features = FeatureMap::new();
    Arc::clone(module).initialize_features(&mut features)?;
    module.base().install_features(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Feature, add_feature};

    #[derive(Debug)]
    struct Meter {
        base: ModuleBase,
    }

    const METER_DEPRECATED: &[Deprecated] = &[Deprecated::new("watts", "power")];

    impl Module for Meter {
        fn base(&self) -> &ModuleBase {
            &self.base
        }

        fn initialize_features(self: Arc<Self>, features: &mut FeatureMap) -> Result<()> {
            add_feature(
                features,
                Feature::builder(&self, "power", "Power")
                    .getter(|_: &Meter| Ok(FeatureValue::Float(5.0)))
                    .build(),
            )
        }

        fn attribute(&self, name: &str) -> Option<Result<FeatureValue>> {
            (name == "model").then(|| Ok("P110".into()))
        }

        fn deprecated_attributes(&self) -> &'static [Deprecated] {
            METER_DEPRECATED
        }
    }

    fn meter() -> Arc<dyn Module> {
        Arc::new(Meter {
            base: ModuleBase::detached("meter"),
        })
    }

    #[test]
    fn initialize_runs_once() {
        let module = meter();
        initialize(&module).unwrap();
        assert_eq!(module.features().len(), 1);
        assert!(matches!(
            initialize(&module),
            Err(Error::Configuration(ConfigurationError::AlreadyInitialized(_)))
        ));
    }

    #[test]
    fn get_resolves_attributes_features_and_aliases() {
        let module = meter();
        initialize(&module).unwrap();
        assert_eq!(module.get("model").unwrap(), FeatureValue::from("P110"));
        assert_eq!(module.get("power").unwrap(), FeatureValue::Float(5.0));
        assert_eq!(module.get("watts").unwrap(), module.get("power").unwrap());
        assert!(matches!(
            module.get("bogus"),
            Err(Error::MissingAttribute { ref name, .. }) if name == "bogus"
        ));
    }

    #[test]
    fn data_requires_a_device() {
        let module = meter();
        assert!(matches!(
            module.base().with_data(|_| ()),
            Err(Error::Device(DeviceError::Detached))
        ));
    }

    #[test]
    fn into_any_downcasts_to_concrete_type() {
        let module = meter();
        assert!(module.into_any().downcast::<Meter>().is_ok());
    }
}
