// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Protocol-family adapters.
//!
//! The two device families share the module and feature contracts and
//! differ in three places, each captured by [`Family`]:
//!
//! - how capabilities are discovered (static device flags vs. a
//!   negotiated component list)
//! - how a module is admitted ([`Family::Admission`])
//! - how a module's slice is found in a response ([`Family::route`])

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::ProtocolFamily;
use crate::device::DeviceHandle;
use crate::error::Result;
use crate::module::Module;
use crate::transport::{Request, Response};
use crate::types::DeviceIdentity;

/// Rules of one protocol family.
pub trait Family: Sized + Send + Sync + 'static {
    /// Capability metadata read once per negotiation.
    type Capabilities: fmt::Debug + Send + Sync + 'static;

    /// What a module declares to be admitted.
    type Admission: fmt::Debug + Clone + Send + Sync + 'static;

    /// The family this adapter speaks.
    const PROTOCOL: ProtocolFamily;

    /// Request sent once to discover capabilities.
    fn negotiation_request() -> Request;

    /// Extracts capability metadata from the negotiation response.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the response lacks the metadata.
    fn capabilities_from(response: &Response) -> Result<Self::Capabilities>;

    /// Request fragment fetching the device info block on every cycle.
    fn info_request() -> Request;

    /// Extracts the device info block from a response.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the info block is missing.
    fn info_from(response: &Response) -> Result<Value>;

    /// Reads the device identity from the info block.
    fn identity_from(info: &Value) -> DeviceIdentity;

    /// Reads the power state from the info block.
    fn is_on(info: &Value) -> Option<bool>;

    /// Builds the request switching the device on or off.
    fn power_request(on: bool, capabilities: &Self::Capabilities) -> Request;

    /// Checks a reply for per-method failures.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::CommandRejected` if any method failed.
    fn check_reply(response: &Response) -> Result<()>;

    /// Decides whether a module applies to the device.
    fn admits(admission: &Self::Admission, capabilities: &Self::Capabilities, info: &Value) -> bool;

    /// Finds the slice of `response` answering `query`.
    fn route(query: &Request, response: &Response) -> Option<Value>;

    /// Modules considered for every device of the family.
    fn default_catalog() -> Vec<ModuleDescriptor<Self>>;
}

type Constructor<F> =
    Arc<dyn Fn(DeviceHandle, &<F as Family>::Capabilities) -> Arc<dyn Module> + Send + Sync>;

/// Registration entry mapping a module kind to its admission rule and
/// constructor.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use kasalink::module::{Module, ModuleBase};
/// use kasalink::smart::{Requirement, Smart};
/// use kasalink::ModuleDescriptor;
///
/// #[derive(Debug)]
/// struct Humidity {
///     base: ModuleBase,
/// }
///
/// impl Module for Humidity {
///     fn base(&self) -> &ModuleBase {
///         &self.base
///     }
/// }
///
/// let descriptor = ModuleDescriptor::<Smart>::new(
///     "humidity",
///     Requirement::component("humidity"),
///     |device, _| {
///         Arc::new(Humidity {
///             base: ModuleBase::new("humidity", device),
///         })
///     },
/// );
/// assert_eq!(descriptor.name(), "humidity");
/// ```
pub struct ModuleDescriptor<F: Family> {
    name: String,
    admission: F::Admission,
    build: Constructor<F>,
}

impl<F: Family> ModuleDescriptor<F> {
    /// Declares a module kind.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        admission: F::Admission,
        build: impl Fn(DeviceHandle, &F::Capabilities) -> Arc<dyn Module> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            admission,
            build: Arc::new(build),
        }
    }

    /// Returns the module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the admission rule.
    #[must_use]
    pub fn admission(&self) -> &F::Admission {
        &self.admission
    }

    pub(crate) fn instantiate(
        &self,
        device: DeviceHandle,
        capabilities: &F::Capabilities,
    ) -> Arc<dyn Module> {
        (self.build)(device, capabilities)
    }
}

impl<F: Family> Clone for ModuleDescriptor<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            admission: self.admission.clone(),
            build: Arc::clone(&self.build),
        }
    }
}

impl<F: Family> fmt::Debug for ModuleDescriptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("admission", &self.admission)
            .finish_non_exhaustive()
    }
}
