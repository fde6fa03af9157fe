// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `kasalink` library.
//!
//! The hierarchy mirrors the failure classes of the module system: value
//! validation, transport round trips, payload parsing, module declaration
//! mistakes (configuration), device operations and unknown attributes.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// The transport collaborator failed to complete a round trip.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error occurred while parsing a response.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A module declaration violates an invariant of the module system.
    ///
    /// These are programming errors and surface at registration time.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Error occurred during device operations.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// An attribute that is neither registered nor a deprecated alias.
    #[error("{owner} has no attribute '{name}'")]
    MissingAttribute {
        /// Module or device the lookup was made on.
        owner: String,
        /// The requested attribute name.
        name: String,
    },
}

impl Error {
    /// Returns `true` if this error means the device lacks the capability.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Device(DeviceError::UnsupportedCapability { .. }))
    }
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// The actual value that was provided.
        actual: i64,
    },

    /// A hue value is outside the valid range (0-360).
    #[error("hue value {0} is out of range [0, 360]")]
    InvalidHue(u16),

    /// A saturation value is outside the valid range (0-100).
    #[error("saturation value {0} is out of range [0, 100]")]
    InvalidSaturation(u8),

    /// A brightness value is outside the valid range (0-100).
    #[error("brightness value {0} is out of range [0, 100]")]
    InvalidBrightness(u8),

    /// A feature value has the wrong type for the target.
    #[error("expected {expected} value, found {found}")]
    InvalidType {
        /// The expected value kind.
        expected: &'static str,
        /// The kind that was provided.
        found: &'static str,
    },

    /// A value is not one of the allowed choices.
    #[error("'{value}' is not one of {choices:?}")]
    InvalidChoice {
        /// The rejected value.
        value: String,
        /// The allowed values.
        choices: Vec<String>,
    },
}

/// Errors reported by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection to the device failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Socket level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device answered with something that is not a JSON object.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The transport has been closed.
    #[error("transport closed")]
    Closed,
}

/// Errors related to parsing device responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Unexpected response format.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// Invariant violations in module declarations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Two features share an id within one device.
    #[error("duplicate feature id '{id}' registered by {module}")]
    DuplicateFeature {
        /// The feature id.
        id: String,
        /// The module that attempted the second registration.
        module: String,
    },

    /// Two modules share a name within one device.
    #[error("duplicate module '{0}'")]
    DuplicateModule(String),

    /// Two query fragments disagree on the same request key.
    #[error("query key '{key}' requested differently by {first} and {second}")]
    QueryCollision {
        /// The colliding request key.
        key: String,
        /// Owner of the fragment merged first.
        first: String,
        /// Owner of the conflicting fragment.
        second: String,
    },

    /// Features of a module were initialized more than once.
    #[error("features of module '{0}' are already initialized")]
    AlreadyInitialized(String),
}

/// Errors related to device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Device does not support the requested capability.
    #[error("device does not support {capability}")]
    UnsupportedCapability {
        /// The capability that is not supported.
        capability: String,
    },

    /// Data was requested before a refresh cycle delivered it.
    #[error("no data for '{module}', call update() first")]
    UpdateRequired {
        /// The module whose data is missing.
        module: String,
    },

    /// The device has not negotiated its capabilities yet.
    #[error("device is not initialized")]
    NotInitialized,

    /// The device owning a module or feature has been dropped.
    #[error("device has been dropped")]
    Detached,

    /// The feature has no setter.
    #[error("feature '{0}' is read-only")]
    ReadOnlyFeature(String),

    /// Command was rejected by the device.
    #[error("{method} rejected with error code {code}")]
    CommandRejected {
        /// The method the device refused.
        method: String,
        /// The error code reported by the device.
        code: i64,
    },
}

impl DeviceError {
    pub(crate) fn unsupported(capability: impl Into<String>) -> Self {
        Self::UnsupportedCapability {
            capability: capability.into(),
        }
    }

    pub(crate) fn update_required(module: impl Into<String>) -> Self {
        Self::UpdateRequired {
            module: module.into(),
        }
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 0,
            max: 100,
            actual: 150,
        };
        assert_eq!(err.to_string(), "value 150 is out of range [0, 100]");
    }

    #[test]
    fn error_from_value_error() {
        let value_err = ValueError::InvalidHue(400);
        let err: Error = value_err.into();
        assert!(matches!(err, Error::Value(ValueError::InvalidHue(400))));
    }

    #[test]
    fn query_collision_display() {
        let err = ConfigurationError::QueryCollision {
            key: "get_device_info".to_string(),
            first: "device".to_string(),
            second: "light".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "query key 'get_device_info' requested differently by device and light"
        );
    }

    #[test]
    fn unsupported_is_detected() {
        let err: Error = DeviceError::unsupported("color").into();
        assert!(err.is_unsupported());
        assert_eq!(
            err.to_string(),
            "device error: device does not support color"
        );
    }

    #[test]
    fn missing_attribute_display() {
        let err = Error::MissingAttribute {
            owner: "energy".to_string(),
            name: "bogus".to_string(),
        };
        assert_eq!(err.to_string(), "energy has no attribute 'bogus'");
    }
}
