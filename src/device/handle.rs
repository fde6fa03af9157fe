// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State shared between a device and its modules.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{DeviceError, Result};
use crate::module::{CyclePhase, Module, ModuleRegistry, ModuleSet};
use crate::transport::{Request, Response, Transport};

/// Device state as of the last committed refresh cycle.
///
/// A snapshot is immutable; each successful cycle replaces it as a whole,
/// so readers see either the previous or the new cycle, never a mix.
#[derive(Debug, Default)]
pub struct Snapshot {
    info: Value,
    slices: HashMap<String, Value>,
    raw: Response,
    cycle: u64,
}

impl Snapshot {
    pub(crate) fn negotiated(info: Value) -> Self {
        Self {
            info,
            ..Self::default()
        }
    }

    pub(crate) fn next(
        &self,
        info: Value,
        slices: HashMap<String, Value>,
        raw: Response,
    ) -> Self {
        Self {
            info,
            slices,
            raw,
            cycle: self.cycle + 1,
        }
    }

    /// Returns the device info block.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` if no info has been received.
    pub fn info(&self) -> Result<&Value> {
        if self.info.is_null() {
            return Err(DeviceError::update_required("device").into());
        }
        Ok(&self.info)
    }

    /// Returns the response slice routed to `module`.
    #[must_use]
    pub fn slice(&self, module: &str) -> Option<&Value> {
        self.slices.get(module)
    }

    /// Returns the full response of the last cycle.
    #[must_use]
    pub fn raw(&self) -> &Response {
        &self.raw
    }

    /// Returns the number of committed cycles.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }
}

pub(crate) struct DeviceShared {
    host: String,
    transport: Arc<dyn Transport>,
    snapshot: RwLock<Arc<Snapshot>>,
    registry: RwLock<Arc<ModuleRegistry>>,
    phase: RwLock<CyclePhase>,
}

impl DeviceShared {
    pub(crate) fn new(host: String, transport: Arc<dyn Transport>) -> Self {
        Self {
            host,
            transport,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            registry: RwLock::new(Arc::new(ModuleRegistry::default())),
            phase: RwLock::new(CyclePhase::Uninitialized),
        }
    }

    pub(crate) fn host(&self) -> &str {
        &self.host
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub(crate) fn registry(&self) -> Arc<ModuleRegistry> {
        Arc::clone(&self.registry.read())
    }

    pub(crate) fn phase(&self) -> CyclePhase {
        *self.phase.read()
    }

    pub(crate) fn set_phase(&self, phase: CyclePhase) {
        tracing::debug!(host = %self.host, %phase, "Cycle phase");
        *self.phase.write() = phase;
    }

    /// Replaces the module set, as after a capability negotiation.
    pub(crate) fn install(&self, registry: ModuleRegistry, snapshot: Snapshot) {
        *self.registry.write() = Arc::new(registry);
        *self.snapshot.write() = Arc::new(snapshot);
    }

    /// Publishes the state of a completed round trip.
    pub(crate) fn commit(&self, snapshot: Snapshot) {
        *self.snapshot.write() = Arc::new(snapshot);
    }
}

/// Non-owning reference from a module back to its device.
///
/// Gives modules read access to the last committed [`Snapshot`], to
/// sibling modules, and to the transport for their own commands.
#[derive(Clone, Default)]
pub struct DeviceHandle(Weak<DeviceShared>);

impl DeviceHandle {
    pub(crate) fn new(shared: &Arc<DeviceShared>) -> Self {
        Self(Arc::downgrade(shared))
    }

    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self::default()
    }

    fn shared(&self) -> Result<Arc<DeviceShared>> {
        self.0.upgrade().ok_or_else(|| DeviceError::Detached.into())
    }

    /// Returns the last committed snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Detached` if the device has been dropped.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        Ok(self.shared()?.snapshot())
    }

    /// Returns the sibling module of concrete type `M`.
    #[must_use]
    pub fn module<M: Module>(&self) -> Option<Arc<M>> {
        self.shared().ok()?.registry().modules().get::<M>()
    }

    /// Returns all modules of the device.
    #[must_use]
    pub fn modules(&self) -> ModuleSet {
        self.shared()
            .map(|shared| shared.registry().modules().clone())
            .unwrap_or_default()
    }

    /// Sends a request outside the refresh cycle.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Detached` if the device has been dropped, or
    /// the transport error of the round trip.
    pub async fn send(&self, request: &Request) -> Result<Response> {
        let (host, transport) = {
            let shared = self.shared()?;
            (shared.host().to_string(), Arc::clone(shared.transport()))
        };
        tracing::debug!(
            host = %host,
            keys = ?request.keys().collect::<Vec<_>>(),
            "Sending command"
        );
        let response = transport.send(request).await?;
        Ok(response)
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.upgrade() {
            Some(shared) => write!(f, "DeviceHandle({})", shared.host()),
            None => f.write_str("DeviceHandle(<detached>)"),
        }
    }
}
