// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! User-facing features exposed by modules.
//!
//! A [`Feature`] describes one attribute or action of a device (a reading,
//! a switch, a number with a range, a choice) and is bound at construction
//! time to accessors on the module that registered it. The feature holds
//! only a weak reference to that module: reading a value always goes
//! through the module's cached device state, and writing always goes
//! through the module's setter.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example(device: &kasalink::Device<kasalink::smart::Smart>) -> kasalink::Result<()> {
//! for feature in device.features().values() {
//!     println!("{feature}");
//! }
//!
//! if let Some(brightness) = device.feature("brightness") {
//!     brightness.set_value(80).await?;
//!     // The new value becomes visible after the next refresh.
//!     device.update().await?;
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde_json::Value;

use crate::error::{ConfigurationError, DeviceError, Result};
use crate::module::Module;
use crate::types::FeatureValue;

/// Where a feature belongs in a user interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Main controls and readings of the device.
    Primary,
    /// Secondary read-only information.
    Info,
    /// Settings.
    Config,
    /// Diagnostics.
    Debug,
}

/// Kind of value a feature carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureType {
    /// Read-only measurement.
    Sensor,
    /// Read-only on/off state.
    BinarySensor,
    /// Writable on/off state.
    Switch,
    /// Writable number within a range.
    Number,
    /// Writable value from a list of choices.
    Choice,
    /// Trigger without a value.
    Action,
    /// Anything else.
    Unknown,
}

type Getter = Box<dyn Fn() -> Result<FeatureValue> + Send + Sync>;
type Setter = Box<dyn Fn(FeatureValue) -> BoxFuture<'static, Result<Value>> + Send + Sync>;
type RangeGetter = Box<dyn Fn() -> Result<(i64, i64)> + Send + Sync>;
type ChoicesGetter = Box<dyn Fn() -> Result<Vec<String>> + Send + Sync>;

/// All features of a module or device, keyed by feature id.
pub type FeatureMap = BTreeMap<String, Arc<Feature>>;

/// A described, typed attribute or action of a device.
pub struct Feature {
    id: String,
    name: String,
    container: String,
    unit: Option<String>,
    precision_hint: Option<usize>,
    category: Category,
    kind: FeatureType,
    icon: Option<String>,
    getter: Option<Getter>,
    setter: Option<Setter>,
    range: Option<RangeGetter>,
    choices: Option<ChoicesGetter>,
}

impl Feature {
    /// Starts describing a feature bound to `container`.
    ///
    /// Accessors registered on the builder receive the container when the
    /// feature is used; the feature itself keeps only a weak reference.
    #[must_use]
    pub fn builder<M: Module>(
        container: &Arc<M>,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> FeatureBuilder<M> {
        FeatureBuilder {
            container: Arc::downgrade(container),
            module: container.name().to_string(),
            id: id.into(),
            name: name.into(),
            unit: None,
            precision_hint: None,
            category: None,
            kind: FeatureType::Sensor,
            icon: None,
            getter: None,
            setter: None,
            range: None,
            choices: None,
        }
    }

    /// Returns the id, unique within a device.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the module that registered this feature.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Returns the unit of the value, if any.
    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Returns the number of decimals worth displaying.
    #[must_use]
    pub fn precision_hint(&self) -> Option<usize> {
        self.precision_hint
    }

    /// Returns the category.
    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns the kind of value.
    #[must_use]
    pub fn kind(&self) -> FeatureType {
        self.kind
    }

    /// Returns the icon name, if any.
    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    /// Returns `true` if the feature accepts [`set_value`](Self::set_value).
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Reads the current value through the owning module.
    ///
    /// Every call re-reads the module's cached state. Actions report
    /// [`FeatureValue::Null`].
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::UpdateRequired` before the first refresh, or
    /// `DeviceError::Detached` if the device has been dropped.
    pub fn value(&self) -> Result<FeatureValue> {
        match &self.getter {
            Some(getter) => getter(),
            None => Ok(FeatureValue::Null),
        }
    }

    /// Writes a value through the owning module.
    ///
    /// Returns the device acknowledgement. The value read back by
    /// [`value`](Self::value) only changes after the next refresh.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::ReadOnlyFeature` if the feature has no setter,
    /// or whatever error the module's setter reports (out of range values,
    /// unsupported capabilities, transport failures).
    pub async fn set_value(&self, value: impl Into<FeatureValue>) -> Result<Value> {
        let Some(setter) = &self.setter else {
            return Err(DeviceError::ReadOnlyFeature(self.id.clone()).into());
        };
        let value = value.into();
        tracing::debug!(feature = %self.id, %value, "Setting feature");
        setter(value).await
    }

    /// Returns the valid range of a number feature.
    ///
    /// The range is a hint; the module setter enforces it.
    ///
    /// # Errors
    ///
    /// Returns an error if the range depends on state not yet fetched.
    pub fn range(&self) -> Result<Option<(i64, i64)>> {
        self.range.as_ref().map(|range| range()).transpose()
    }

    /// Returns the allowed values of a choice feature.
    ///
    /// # Errors
    ///
    /// Returns an error if the choices depend on state not yet fetched.
    pub fn choices(&self) -> Result<Option<Vec<String>>> {
        self.choices.as_ref().map(|choices| choices()).transpose()
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("container", &self.container)
            .field("category", &self.category)
            .field("kind", &self.kind)
            .field("writable", &self.is_writable())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): ", self.name, self.id)?;
        match self.value() {
            Ok(FeatureValue::Float(v)) if self.precision_hint.is_some() => {
                let precision = self.precision_hint.unwrap_or_default();
                write!(f, "{v:.precision$}")?;
            }
            Ok(value) => write!(f, "{value}")?,
            Err(e) => return write!(f, "<{e}>"),
        }
        if let Some(unit) = &self.unit {
            write!(f, " {unit}")?;
        }
        Ok(())
    }
}

/// Builder binding a feature description to a module.
pub struct FeatureBuilder<M> {
    container: Weak<M>,
    module: String,
    id: String,
    name: String,
    unit: Option<String>,
    precision_hint: Option<usize>,
    category: Option<Category>,
    kind: FeatureType,
    icon: Option<String>,
    getter: Option<Getter>,
    setter: Option<Setter>,
    range: Option<RangeGetter>,
    choices: Option<ChoicesGetter>,
}

impl<M: Module> FeatureBuilder<M> {
    /// Sets the unit.
    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets the number of decimals worth displaying.
    #[must_use]
    pub fn precision(mut self, decimals: usize) -> Self {
        self.precision_hint = Some(decimals);
        self
    }

    /// Sets the category. Defaults to `Config` for writable features and
    /// `Info` otherwise.
    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Sets the kind of value. Defaults to `Sensor`.
    #[must_use]
    pub fn kind(mut self, kind: FeatureType) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the icon name.
    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Binds the value accessor.
    #[must_use]
    pub fn getter<G>(mut self, getter: G) -> Self
    where
        G: Fn(&M) -> Result<FeatureValue> + Send + Sync + 'static,
    {
        let container = self.container.clone();
        self.getter = Some(Box::new(move || {
            let module = container.upgrade().ok_or(DeviceError::Detached)?;
            getter(&module)
        }));
        self
    }

    /// Binds the setter, an asynchronous operation on the module.
    #[must_use]
    pub fn setter<S, Fut>(mut self, setter: S) -> Self
    where
        S: Fn(Arc<M>, FeatureValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let container = self.container.clone();
        self.setter = Some(Box::new(move |value| match container.upgrade() {
            Some(module) => setter(module, value).boxed(),
            None => future::ready(Err(DeviceError::Detached.into())).boxed(),
        }));
        self
    }

    /// Binds an action: a setter that ignores its value.
    #[must_use]
    pub fn action<A, Fut>(self, action: A) -> Self
    where
        A: Fn(Arc<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.kind(FeatureType::Action)
            .setter(move |module, _| action(module))
    }

    /// Binds a range accessor for number features.
    #[must_use]
    pub fn range<R>(mut self, range: R) -> Self
    where
        R: Fn(&M) -> Result<(i64, i64)> + Send + Sync + 'static,
    {
        let container = self.container.clone();
        self.range = Some(Box::new(move || {
            let module = container.upgrade().ok_or(DeviceError::Detached)?;
            range(&module)
        }));
        self
    }

    /// Declares a range that does not depend on device state.
    #[must_use]
    pub fn fixed_range(mut self, min: i64, max: i64) -> Self {
        self.range = Some(Box::new(move || Ok((min, max))));
        self
    }

    /// Binds a choices accessor for choice features.
    #[must_use]
    pub fn choices<C>(mut self, choices: C) -> Self
    where
        C: Fn(&M) -> Result<Vec<String>> + Send + Sync + 'static,
    {
        let container = self.container.clone();
        self.choices = Some(Box::new(move || {
            let module = container.upgrade().ok_or(DeviceError::Detached)?;
            choices(&module)
        }));
        self
    }

    /// Finishes the feature.
    #[must_use]
    pub fn build(self) -> Feature {
        let category = self.category.unwrap_or(if self.setter.is_some() {
            Category::Config
        } else {
            Category::Info
        });
        Feature {
            id: self.id,
            name: self.name,
            container: self.module,
            unit: self.unit,
            precision_hint: self.precision_hint,
            category,
            kind: self.kind,
            icon: self.icon,
            getter: self.getter,
            setter: self.setter,
            range: self.range,
            choices: self.choices,
        }
    }
}

/// Adds a feature to a map, rejecting duplicate ids.
///
/// This is the single registration path used by every module and by the
/// device when it merges module features.
///
/// # Errors
///
/// Returns `ConfigurationError::DuplicateFeature` if the id is taken.
pub fn add_feature(features: &mut FeatureMap, feature: impl Into<Arc<Feature>>) -> Result<()> {
    let feature = feature.into();
    if features.contains_key(feature.id()) {
        return Err(ConfigurationError::DuplicateFeature {
            id: feature.id().to_string(),
            module: feature.container().to_string(),
        }
        .into());
    }
    features.insert(feature.id().to_string(), feature);
    Ok(())
}
