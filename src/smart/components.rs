// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Negotiated components and module requirements.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ParseError, Result};

#[derive(Debug, Deserialize)]
struct ComponentEntry {
    id: String,
    ver_code: u32,
}

#[derive(Debug, Deserialize)]
struct ComponentList {
    component_list: Vec<ComponentEntry>,
}

/// Component ids the device reported, with their versions.
///
/// # Examples
///
/// ```
/// use kasalink::smart::Components;
///
/// let components = Components::new().with("energy_monitoring", 2);
/// assert_eq!(components.version("energy_monitoring"), Some(2));
/// assert!(!components.contains("fan_control"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Components(BTreeMap<String, u32>);

impl Components {
    /// Creates an empty component set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a component.
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, version: u32) -> Self {
        self.0.insert(id.into(), version);
        self
    }

    /// Parses a `component_nego` result.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::UnexpectedFormat` if the result has no
    /// well-formed `component_list`.
    pub fn from_negotiation(result: &Value) -> Result<Self> {
        let list = ComponentList::deserialize(result)
            .map_err(|e| ParseError::UnexpectedFormat(format!("component_list: {e}")))?;
        Ok(list
            .component_list
            .into_iter()
            .map(|entry| (entry.id, entry.ver_code))
            .collect())
    }

    /// Returns the version of a component.
    #[must_use]
    pub fn version(&self, id: &str) -> Option<u32> {
        self.0.get(id).copied()
    }

    /// Returns `true` if the device has the component.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Returns the number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no component was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates components and versions in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(id, version)| (id.as_str(), *version))
    }
}

impl FromIterator<(String, u32)> for Components {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What a structured module needs to be admitted.
///
/// A module is admitted when its component is present (if it names one)
/// and its key is present in the device info block (if it names one). A
/// requirement naming neither admits the module on every device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Requirement {
    /// Component id that must have been negotiated.
    pub component: Option<&'static str>,
    /// Key that must be present in the device info block.
    pub key_on_parent: Option<&'static str>,
}

impl Requirement {
    /// Requires a component.
    #[must_use]
    pub const fn component(id: &'static str) -> Self {
        Self {
            component: Some(id),
            key_on_parent: None,
        }
    }

    /// Requires a key in the device info block.
    #[must_use]
    pub const fn key_on_parent(key: &'static str) -> Self {
        Self {
            component: None,
            key_on_parent: Some(key),
        }
    }

    /// Returns `true` if a device with `components` and `info` satisfies
    /// this requirement.
    #[must_use]
    pub fn is_met(&self, components: &Components, info: &Value) -> bool {
        self.component.is_none_or(|id| components.contains(id))
            && self.key_on_parent.is_none_or(|key| info.get(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_component_list() {
        let components = Components::from_negotiation(&json!({
            "component_list": [
                {"id": "device", "ver_code": 2},
                {"id": "brightness", "ver_code": 1},
            ]
        }))
        .unwrap();
        assert_eq!(components.len(), 2);
        assert_eq!(components.version("device"), Some(2));
        assert_eq!(
            components.iter().collect::<Vec<_>>(),
            [("brightness", 1), ("device", 2)]
        );
    }

    #[test]
    fn malformed_list_is_a_parse_error() {
        let err = Components::from_negotiation(&json!({"error_code": -1})).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Parse(ParseError::UnexpectedFormat(_))
        ));
    }

    #[test]
    fn requirement_checks_component_and_parent_key() {
        let components = Components::new().with("brightness", 1);
        let info = json!({"detected": false});

        assert!(Requirement::component("brightness").is_met(&components, &info));
        assert!(!Requirement::component("color").is_met(&components, &info));
        assert!(Requirement::key_on_parent("detected").is_met(&components, &info));
        assert!(!Requirement::key_on_parent("in_alarm").is_met(&components, &info));
        assert!(Requirement::default().is_met(&components, &json!({})));

        let both = Requirement {
            component: Some("brightness"),
            key_on_parent: Some("detected"),
        };
        assert!(both.is_met(&components, &info));
        assert!(!both.is_met(&Components::new(), &info));
    }
}
