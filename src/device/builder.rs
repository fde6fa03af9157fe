// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builder for [`Device`].

use std::sync::Arc;

use super::Device;
use crate::config::DeviceConfig;
use crate::error::Result;
use crate::family::{Family, ModuleDescriptor};
use crate::transport::Transport;

/// Builder for creating a [`Device`] with a custom module catalog.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use kasalink::{Device, DeviceConfig, ProtocolFamily};
/// use kasalink::smart::Smart;
/// use kasalink::transport::MemoryTransport;
/// use serde_json::json;
///
/// let transport = Arc::new(MemoryTransport::new(ProtocolFamily::Smart, json!({})));
/// let device = Device::<Smart>::builder(DeviceConfig::new("10.0.0.5"), transport)
///     .without_default_modules()
///     .build_without_probe();
/// assert!(!device.is_initialized());
/// ```
pub struct DeviceBuilder<F: Family> {
    config: DeviceConfig,
    transport: Arc<dyn Transport>,
    catalog: Vec<ModuleDescriptor<F>>,
}

impl<F: Family> DeviceBuilder<F> {
    /// Creates a builder with the default module catalog of the family.
    #[must_use]
    pub fn new(config: DeviceConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            catalog: F::default_catalog(),
        }
    }

    /// Adds a module kind to the catalog.
    #[must_use]
    pub fn with_module(mut self, descriptor: ModuleDescriptor<F>) -> Self {
        self.catalog.push(descriptor);
        self
    }

    /// Removes every module kind registered so far.
    #[must_use]
    pub fn without_default_modules(mut self) -> Self {
        self.catalog.clear();
        self
    }

    /// Builds the device without contacting it.
    ///
    /// Capabilities are negotiated on the first [`Device::update`].
    #[must_use]
    pub fn build_without_probe(self) -> Device<F> {
        Device::new(self.config, self.transport, self.catalog)
    }

    /// Builds the device and runs a first refresh cycle.
    ///
    /// # Errors
    ///
    /// Returns the error of the negotiation or of the first refresh.
    pub async fn build(self) -> Result<Device<F>> {
        let device = self.build_without_probe();
        device.update().await?;
        Ok(device)
    }
}

impl<F: Family> std::fmt::Debug for DeviceBuilder<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuilder")
            .field("config", &self.config)
            .field("transport", &self.transport)
            .field("catalog", &self.catalog)
            .finish()
    }
}
