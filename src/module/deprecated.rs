// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Retired attribute names and their replacements.

/// Log target of deprecation warnings.
pub const DEPRECATION_TARGET: &str = "kasalink::deprecated";

/// A retired name that keeps working through its replacement.
///
/// Lookups consult a table of these before failing with
/// [`Error::MissingAttribute`](crate::Error::MissingAttribute).
///
/// # Examples
///
/// ```
/// use kasalink::module::Deprecated;
///
/// const TABLE: &[Deprecated] = &[Deprecated::new("emeter_today", "consumption_today")];
/// let alias = Deprecated::find(TABLE, "emeter_today").unwrap();
/// assert_eq!(alias.replacement, "consumption_today");
/// assert!(Deprecated::find(TABLE, "consumption_today").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deprecated {
    /// The retired name.
    pub name: &'static str,
    /// The name to use instead.
    pub replacement: &'static str,
}

impl Deprecated {
    /// Declares a retired name.
    #[must_use]
    pub const fn new(name: &'static str, replacement: &'static str) -> Self {
        Self { name, replacement }
    }

    /// Finds the entry for `name` in a table.
    #[must_use]
    pub fn find<'a>(table: &'a [Self], name: &str) -> Option<&'a Self> {
        table.iter().find(|entry| entry.name == name)
    }

    /// Emits the deprecation warning for one access.
    pub fn warn(&self, owner: &str) {
        tracing::warn!(
            target: DEPRECATION_TARGET,
            owner,
            name = self.name,
            replacement = self.replacement,
            "{} is deprecated, use {} instead",
            self.name,
            self.replacement
        );
    }
}
