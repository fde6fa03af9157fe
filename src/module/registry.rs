// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Module collections and the refresh-cycle driver.
//!
//! A refresh cycle moves through four phases:
//!
//! 1. **Collecting**: every module contributes its [`Module::query`]
//!    fragment and the fragments are merged into one request
//! 2. **Fetching**: the device performs the round trip
//! 3. **Dispatching**: each module's slice is routed out of the response
//! 4. **Finalizing**: every [`Module::post_update`] hook runs in
//!    registration order
//!
//! The registry implements the pure parts (1, 3, 4); the device owns the
//! round trip and the commit of the new state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::Module;
use crate::error::{ConfigurationError, Result};
use crate::feature::{FeatureMap, add_feature};
use crate::transport::{Request, Response};

/// Phase of the refresh cycle a device is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CyclePhase {
    /// No capability negotiation has happened yet.
    #[default]
    Uninitialized,
    /// Merging module queries.
    Collecting,
    /// Waiting for the round trip.
    Fetching,
    /// Routing the response to modules.
    Dispatching,
    /// Running post-update hooks.
    Finalizing,
    /// Between cycles.
    Idle,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Collecting => "collecting",
            Self::Fetching => "fetching",
            Self::Dispatching => "dispatching",
            Self::Finalizing => "finalizing",
            Self::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// Ordered, name-keyed collection of the modules of one device.
#[derive(Clone, Default)]
pub struct ModuleSet {
    modules: Vec<Arc<dyn Module>>,
    index: HashMap<String, usize>,
}

impl ModuleSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a module.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::DuplicateModule` if the name is taken.
    pub fn insert(&mut self, module: Arc<dyn Module>) -> Result<()> {
        let name = module.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ConfigurationError::DuplicateModule(name).into());
        }
        self.index.insert(name, self.modules.len());
        self.modules.push(module);
        Ok(())
    }

    /// Returns the module of concrete type `M`, if present.
    #[must_use]
    pub fn get<M: Module>(&self) -> Option<Arc<M>> {
        self.modules
            .iter()
            .find_map(|module| Arc::clone(module).into_any().downcast::<M>().ok())
    }

    /// Returns the module registered under `name`.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.index.get(name).map(|&i| &self.modules[i])
    }

    /// Returns `true` if a module named `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the number of modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterates modules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Module>> {
        self.modules.iter()
    }

    /// Iterates module names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|module| module.name())
    }
}

impl fmt::Debug for ModuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// The admitted modules of one device and their merged features.
///
/// Built once per capability negotiation and immutable afterwards.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: ModuleSet,
    features: FeatureMap,
}

impl ModuleRegistry {
    /// Registers admitted modules and initializes their features.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if two modules share a name, two
    /// features share an id across the device, or a module was already
    /// initialized.
    pub fn build(modules: impl IntoIterator<Item = Arc<dyn Module>>) -> Result<Self> {
        let mut set = ModuleSet::new();
        let mut features = FeatureMap::new();
        for module in modules {
            set.insert(Arc::clone(&module))?;
            super::initialize(&module)?;
            for feature in module.features().values() {
                add_feature(&mut features, Arc::clone(feature))?;
            }
            tracing::trace!(
                module = module.name(),
                features = module.features().len(),
                "Module registered"
            );
        }
        Ok(Self {
            modules: set,
            features,
        })
    }

    /// Returns the modules.
    #[must_use]
    pub fn modules(&self) -> &ModuleSet {
        &self.modules
    }

    /// Returns every feature of every module, keyed by id.
    #[must_use]
    pub fn features(&self) -> &FeatureMap {
        &self.features
    }

    /// Merges every module query into `base`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::QueryCollision` if two fragments ask
    /// for the same key with different values.
    pub fn collect(&self, base: Request) -> Result<Request> {
        let mut owners = HashMap::new();
        let mut request = Request::new();
        merge_fragment(&mut request, &mut owners, "device", base)?;
        for module in self.modules.iter() {
            merge_fragment(&mut request, &mut owners, module.name(), module.query())?;
        }
        Ok(request)
    }

    /// Routes the response slice of each module.
    ///
    /// `route` receives the module query and the full response. Modules
    /// without a query get no slice; modules whose slice is missing are
    /// logged and left without data for this cycle.
    pub fn dispatch(
        &self,
        response: &Response,
        route: impl Fn(&Request, &Response) -> Option<Value>,
    ) -> HashMap<String, Value> {
        let mut slices = HashMap::new();
        for module in self.modules.iter() {
            let query = module.query();
            if query.is_empty() {
                continue;
            }
            match route(&query, response) {
                Some(slice) => {
                    slices.insert(module.name().to_string(), slice);
                }
                None => {
                    tracing::warn!(module = module.name(), "Response has no data for module");
                }
            }
        }
        slices
    }

    /// Runs every post-update hook in registration order.
    ///
    /// A failing hook is logged and does not prevent the others from running.
    pub fn finalize(&self) {
        for module in self.modules.iter() {
            if let Err(e) = module.post_update(&self.modules) {
                tracing::warn!(module = module.name(), error = %e, "Post-update hook failed");
            }
        }
    }
}

/// Merges one query fragment into a request.
///
/// A key requested again with an identical value is merged once; a key
/// requested with a different value is a collision.
///
/// # Errors
///
/// Returns `ConfigurationError::QueryCollision` on conflicting values.
pub fn merge_fragment(
    request: &mut Request,
    owners: &mut HashMap<String, String>,
    owner: &str,
    fragment: Request,
) -> Result<()> {
    for (key, value) in fragment {
        match request.get(&key) {
            Some(existing) if *existing == value => {}
            Some(_) => {
                return Err(ConfigurationError::QueryCollision {
                    first: owners.get(&key).cloned().unwrap_or_default(),
                    second: owner.to_string(),
                    key,
                }
                .into());
            }
            None => {
                owners.insert(key.clone(), owner.to_string());
                request.insert(key, value);
            }
        }
    }
    Ok(())
}

/// Routes a response by the keys of a query.
///
/// A single-key query receives the value under that key; a multi-key query
/// receives an object of the keys present. Values rejected by `usable` are
/// treated as absent.
pub(crate) fn route_by_keys(
    query: &Request,
    response: &Response,
    usable: impl Fn(&Value) -> bool,
) -> Option<Value> {
    let mut found = query
        .keys()
        .filter_map(|key| {
            response
                .get(key)
                .filter(|value| usable(value))
                .map(|value| (key.clone(), value.clone()))
        })
        .collect::<Map<String, Value>>();
    if query.len() == 1 {
        return found.into_iter().next().map(|(_, value)| value);
    }
    if found.is_empty() {
        return None;
    }
    found.retain(|_, value| !value.is_null());
    Some(Value::Object(found))
}
