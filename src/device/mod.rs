// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level device abstraction.
//!
//! A [`Device`] owns the modules admitted for one physical device and
//! drives their refresh cycle. It is generic over the protocol
//! [`Family`](crate::Family), which decides admission and response routing.
//!
//! # Refresh Cycles
//!
//! [`Device::update`] runs one Collecting → Fetching → Dispatching →
//! Finalizing cycle under a per-device lock. The new state is committed
//! only after the round trip succeeded; a failed or cancelled round trip
//! leaves every module on its last known state.
//!
//! ```no_run
//! use std::sync::Arc;
//! use kasalink::{Device, DeviceConfig, ProtocolFamily};
//! use kasalink::iot::Iot;
//!
//! # async fn example() -> kasalink::Result<()> {
//! let device = Device::<Iot>::connect(DeviceConfig::new("192.168.1.100")).await?;
//!
//! println!("{device}");
//! if let Some(energy) = device.energy() {
//!     println!("Drawing {:?} W", energy.current_consumption()?);
//! }
//!
//! device.turn_off().await?;
//! device.update().await?;
//! assert_eq!(device.is_on()?, false);
//! # Ok(())
//! # }
//! ```

mod builder;
mod handle;

pub use builder::DeviceBuilder;
pub use handle::{DeviceHandle, Snapshot};

pub(crate) use handle::DeviceShared;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::config::DeviceConfig;
use crate::error::{DeviceError, Error, Result};
use crate::family::{Family, ModuleDescriptor};
use crate::feature::{Category, Feature, FeatureMap};
use crate::interfaces::{Energy, Light, LightEffect};
use crate::module::{CyclePhase, Deprecated, Module, ModuleRegistry, ModuleSet};
use crate::transport::{Request, Response, Transport};
use crate::types::{DeviceIdentity, DeviceType, FeatureValue};

/// Retired device attributes and the module attribute replacing them.
///
/// Replacements of the form `module.attribute` resolve through the module
/// registered under that name.
const DEVICE_DEPRECATED: &[Deprecated] = &[
    Deprecated::new("is_bulb", "device_type"),
    Deprecated::new("is_plug", "device_type"),
    Deprecated::new("is_strip", "device_type"),
    Deprecated::new("is_dimmer", "device_type"),
    Deprecated::new("is_light_strip", "device_type"),
    Deprecated::new("is_wallswitch", "device_type"),
    Deprecated::new("is_dimmable", "light.is_dimmable"),
    Deprecated::new("is_color", "light.is_color"),
    Deprecated::new("is_variable_color_temp", "light.is_variable_color_temp"),
    Deprecated::new("brightness", "light.brightness"),
    Deprecated::new("hsv", "light.hsv"),
    Deprecated::new("color_temp", "light.color_temp"),
    Deprecated::new("valid_temperature_range", "light.valid_temperature_range"),
    Deprecated::new("led", "led.led"),
    Deprecated::new("effect", "light_effect.effect"),
    Deprecated::new("effect_list", "light_effect.effect_list"),
    Deprecated::new("emeter_realtime", "energy.status"),
    Deprecated::new("emeter_today", "energy.consumption_today"),
    Deprecated::new("emeter_this_month", "energy.consumption_this_month"),
];

/// Sets the cycle phase back to idle when a cycle ends, including when
/// it is cancelled.
struct PhaseGuard<'a>(&'a DeviceShared);

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.0.set_phase(CyclePhase::Idle);
    }
}

/// A device of protocol family `F`.
pub struct Device<F: Family> {
    config: DeviceConfig,
    shared: Arc<DeviceShared>,
    catalog: Vec<ModuleDescriptor<F>>,
    capabilities: RwLock<Option<Arc<F::Capabilities>>>,
    cycle_lock: tokio::sync::Mutex<()>,
}

impl<F: Family> Device<F> {
    /// Starts building a device talking through `transport`.
    #[must_use]
    pub fn builder(config: DeviceConfig, transport: Arc<dyn Transport>) -> DeviceBuilder<F> {
        DeviceBuilder::new(config, transport)
    }

    pub(crate) fn new(
        config: DeviceConfig,
        transport: Arc<dyn Transport>,
        catalog: Vec<ModuleDescriptor<F>>,
    ) -> Self {
        let shared = Arc::new(DeviceShared::new(config.host().to_string(), transport));
        Self {
            config,
            shared,
            catalog,
            capabilities: RwLock::new(None),
            cycle_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        self.config.host()
    }

    /// Returns the phase of the refresh cycle.
    #[must_use]
    pub fn phase(&self) -> CyclePhase {
        self.shared.phase()
    }

    /// Returns the negotiated capabilities, if negotiation happened.
    #[must_use]
    pub fn capabilities(&self) -> Option<Arc<F::Capabilities>> {
        self.capabilities.read().clone()
    }

    /// Returns `true` once capabilities have been negotiated.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.capabilities.read().is_some()
    }

    /// Returns the last committed state.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.snapshot()
    }

    /// Returns a handle modules use to reach this device.
    #[must_use]
    pub fn handle(&self) -> DeviceHandle {
        DeviceHandle::new(&self.shared)
    }

    /// Negotiates capabilities and admits modules.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the negotiation round trip, a
    /// `ParseError` if the capability metadata is malformed, or a
    /// `ConfigurationError` if admitted modules declare conflicting features
    /// or conflicting queries.
    pub async fn initialize(&self) -> Result<()> {
        let _cycle = self.cycle_lock.lock().await;
        self.negotiate().await
    }

    /// Negotiates capabilities again and rebuilds the module set.
    ///
    /// Modules of the previous negotiation are dropped; features obtained
    /// from them report `DeviceError::Detached` once no longer referenced.
    ///
    /// # Errors
    ///
    /// Same as [`initialize`](Self::initialize). On error the previous
    /// module set stays in place.
    pub async fn reinitialize(&self) -> Result<()> {
        let _cycle = self.cycle_lock.lock().await;
        tracing::debug!(host = %self.host(), "Renegotiating capabilities");
        self.negotiate().await
    }

    /// Runs one refresh cycle, negotiating first if needed.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the round trip (no module state
    /// changes in that case), or a `ConfigurationError` if module queries
    /// collide.
    pub async fn update(&self) -> Result<()> {
        let _cycle = self.cycle_lock.lock().await;
        if !self.is_initialized() {
            self.negotiate().await?;
        }
        self.run_cycle().await
    }

    async fn negotiate(&self) -> Result<()> {
        let response = self.shared.transport().send(&F::negotiation_request()).await?;
        let capabilities = F::capabilities_from(&response)?;
        let info = F::info_from(&response)?;

        let handle = self.handle();
        let mut admitted = Vec::new();
        for descriptor in &self.catalog {
            if F::admits(descriptor.admission(), &capabilities, &info) {
                tracing::trace!(module = descriptor.name(), "Module admitted");
                admitted.push(descriptor.instantiate(handle.clone(), &capabilities));
            } else {
                tracing::trace!(module = descriptor.name(), "Module not applicable");
            }
        }

        let registry = ModuleRegistry::build(admitted)?;
        // Colliding queries must fail before the device counts as initialized.
        registry.collect(F::info_request())?;
        tracing::debug!(
            host = %self.host(),
            family = %F::PROTOCOL,
            modules = ?registry.modules(),
            "Capabilities negotiated"
        );
        self.shared.install(registry, Snapshot::negotiated(info));
        *self.capabilities.write() = Some(Arc::new(capabilities));
        self.shared.set_phase(CyclePhase::Idle);
        Ok(())
    }

    async fn run_cycle(&self) -> Result<()> {
        let _idle = PhaseGuard(&self.shared);
        let registry = self.shared.registry();

        self.shared.set_phase(CyclePhase::Collecting);
        let request = registry.collect(F::info_request())?;

        self.shared.set_phase(CyclePhase::Fetching);
        let response = self.shared.transport().send(&request).await?;

        self.shared.set_phase(CyclePhase::Dispatching);
        let previous = self.shared.snapshot();
        let info = F::info_from(&response).or_else(|e| {
            tracing::warn!(host = %self.host(), error = %e, "Keeping previous device info");
            previous.info().cloned()
        })?;
        let slices = registry.dispatch(&response, F::route);
        let snapshot = previous.next(info, slices, response);
        let cycle = snapshot.cycle();
        self.shared.commit(snapshot);

        self.shared.set_phase(CyclePhase::Finalizing);
        registry.finalize();
        tracing::debug!(host = %self.host(), cycle, "Refresh cycle complete");
        Ok(())
    }

    /// Closes the transport.
    ///
    /// # Errors
    ///
    /// Returns the transport error if closing fails.
    pub async fn disconnect(&self) -> Result<()> {
        self.shared.transport().close().await?;
        Ok(())
    }

    /// Sends a raw request outside the refresh cycle.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the round trip.
    pub async fn send(&self, request: &Request) -> Result<Response> {
        self.handle().send(request).await
    }

    /// Returns all admitted modules.
    #[must_use]
    pub fn modules(&self) -> ModuleSet {
        self.shared.registry().modules().clone()
    }

    /// Returns the module of concrete type `M`, if admitted.
    #[must_use]
    pub fn module<M: Module>(&self) -> Option<Arc<M>> {
        self.shared.registry().modules().get::<M>()
    }

    /// Returns the module registered under `name`.
    #[must_use]
    pub fn module_by_name(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.shared.registry().modules().by_name(name).cloned()
    }

    /// Returns the energy meter, if the device has one.
    #[must_use]
    pub fn energy(&self) -> Option<Arc<dyn Energy>> {
        self.modules()
            .iter()
            .find_map(|module| Arc::clone(module).as_energy())
    }

    /// Returns the light, if the device is one.
    #[must_use]
    pub fn light(&self) -> Option<Arc<dyn Light>> {
        self.modules()
            .iter()
            .find_map(|module| Arc::clone(module).as_light())
    }

    /// Returns the light effect controller, if the device has one.
    #[must_use]
    pub fn light_effect(&self) -> Option<Arc<dyn LightEffect>> {
        self.modules()
            .iter()
            .find_map(|module| Arc::clone(module).as_light_effect())
    }

    /// Returns every feature of every admitted module, keyed by id.
    #[must_use]
    pub fn features(&self) -> FeatureMap {
        self.shared.registry().features().clone()
    }

    /// Returns the feature with the given id.
    #[must_use]
    pub fn feature(&self, id: &str) -> Option<Arc<Feature>> {
        self.shared.registry().features().get(id).cloned()
    }

    /// Returns the current values of all primary and info features.
    ///
    /// Features that cannot be read are left out.
    #[must_use]
    pub fn state_information(&self) -> BTreeMap<String, FeatureValue> {
        self.shared
            .registry()
            .features()
            .values()
            .filter(|f| matches!(f.category(), Category::Primary | Category::Info))
            .filter_map(|f| Some((f.name().to_string(), f.value().ok()?)))
            .collect()
    }

    /// Returns the device identity.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the device info is known.
    pub fn identity(&self) -> Result<DeviceIdentity> {
        Ok(F::identity_from(self.shared.snapshot().info()?))
    }

    /// Returns the kind of device, `Unknown` before the info is known.
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        self.identity()
            .map(|identity| identity.device_type)
            .unwrap_or_default()
    }

    /// Returns the user-assigned name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the device info is known.
    pub fn alias(&self) -> Result<Option<String>> {
        Ok(self.identity()?.alias)
    }

    /// Returns the model string.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the device info is known.
    pub fn model(&self) -> Result<String> {
        Ok(self.identity()?.model)
    }

    /// Returns whether the device is on.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the device info is known,
    /// or `ParseError` if the info block has no power state.
    pub fn is_on(&self) -> Result<bool> {
        let snapshot = self.shared.snapshot();
        F::is_on(snapshot.info()?).ok_or_else(|| {
            crate::error::ParseError::MissingField("power state".to_string()).into()
        })
    }

    /// Turns the device on.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::NotInitialized` before negotiation, the
    /// transport error, or `DeviceError::CommandRejected`.
    pub async fn turn_on(&self) -> Result<Value> {
        self.set_power(true).await
    }

    /// Turns the device off.
    ///
    /// # Errors
    ///
    /// Same as [`turn_on`](Self::turn_on).
    pub async fn turn_off(&self) -> Result<Value> {
        self.set_power(false).await
    }

    async fn set_power(&self, on: bool) -> Result<Value> {
        let capabilities = self.capabilities().ok_or(DeviceError::NotInitialized)?;
        let response = self.send(&F::power_request(on, &capabilities)).await?;
        F::check_reply(&response)?;
        Ok(Value::Object(response))
    }

    /// Looks up a device attribute by name.
    ///
    /// Known names are `alias`, `model`, `host`, `device_type`, `device_id`,
    /// `mac` and `is_on`. Retired names that moved to modules keep
    /// resolving with a deprecation warning.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingAttribute` for unknown names,
    /// `DeviceError::UnsupportedCapability` if a retired name points to a
    /// module the device does not have, or the accessor's error.
    pub fn get(&self, name: &str) -> Result<FeatureValue> {
        if let Some(alias) = Deprecated::find(DEVICE_DEPRECATED, name) {
            alias.warn("device");
            return self.resolve_deprecated(alias);
        }
        match name {
            "alias" => Ok(self.alias()?.into()),
            "model" => Ok(self.model()?.into()),
            "host" => Ok(self.host().into()),
            "device_type" => Ok(self.device_type().to_string().into()),
            "device_id" => Ok(self.identity()?.device_id.into()),
            "mac" => Ok(self.identity()?.mac.into()),
            "is_on" => Ok(self.is_on()?.into()),
            _ => Err(Error::MissingAttribute {
                owner: "device".to_string(),
                name: name.to_string(),
            }),
        }
    }

    fn resolve_deprecated(&self, alias: &Deprecated) -> Result<FeatureValue> {
        let Some((module, attribute)) = alias.replacement.split_once('.') else {
            let device_type = self.device_type();
            let matches = match alias.name {
                "is_bulb" => device_type == DeviceType::Bulb,
                "is_plug" => device_type == DeviceType::Plug,
                "is_strip" => device_type == DeviceType::Strip,
                "is_dimmer" => device_type == DeviceType::Dimmer,
                "is_light_strip" => device_type == DeviceType::LightStrip,
                _ => device_type == DeviceType::WallSwitch,
            };
            return Ok(matches.into());
        };
        self.module_by_name(module)
            .ok_or_else(|| DeviceError::unsupported(module))?
            .get(attribute)
    }
}

impl<F: Family> fmt::Debug for Device<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("host", &self.host())
            .field("family", &F::PROTOCOL)
            .field("phase", &self.phase())
            .field("modules", &self.modules())
            .finish_non_exhaustive()
    }
}

impl<F: Family> fmt::Display for Device<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identity() {
            Ok(identity) if self.shared.snapshot().cycle() > 0 => write!(
                f,
                "<{} at {} - {} ({})>",
                identity.device_type,
                self.host(),
                identity.alias.as_deref().unwrap_or_default(),
                identity.model
            ),
            _ => write!(
                f,
                "<{} device at {} - update() needed>",
                F::PROTOCOL,
                self.host()
            ),
        }
    }
}
