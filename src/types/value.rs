// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dynamically typed values read from and written to features.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::{ColorTempRange, EmeterStatus, Hsv, LightState};
use crate::error::ValueError;

/// A value exposed by a [`Feature`](crate::Feature).
///
/// Features of every module share one value type so that callers can walk
/// the feature collection of a device without knowing the concrete modules.
///
/// # Examples
///
/// ```
/// use kasalink::FeatureValue;
///
/// let value = FeatureValue::from(42_u8);
/// assert_eq!(value.as_i64(), Some(42));
/// assert_eq!(i64::try_from(value).unwrap(), 42);
///
/// let missing = FeatureValue::from(None::<f64>);
/// assert!(missing.is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// No value (sensor reading not reported by this firmware).
    Null,
    /// Switch or binary sensor state.
    Bool(bool),
    /// Integral number.
    Int(i64),
    /// Fractional number.
    Float(f64),
    /// Text or choice.
    Text(String),
    /// Light color.
    Hsv(Hsv),
    /// Structured value passed through from the device.
    Json(Value),
}

impl FeatureValue {
    /// Returns a short name for the kind of value.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Hsv(_) => "hsv",
            Self::Json(_) => "json",
        }
    }

    /// Returns `true` for [`FeatureValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean value, if this is a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the numeric value, converting integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the text value, if this is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError::InvalidType {
            expected,
            found: self.kind(),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Hsv(hsv) => write!(f, "{hsv}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FeatureValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u8> for FeatureValue {
    fn from(value: u8) -> Self {
        Self::Int(value.into())
    }
}

impl From<u16> for FeatureValue {
    fn from(value: u16) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for FeatureValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Hsv> for FeatureValue {
    fn from(value: Hsv) -> Self {
        Self::Hsv(value)
    }
}

impl From<ColorTempRange> for FeatureValue {
    fn from(value: ColorTempRange) -> Self {
        Self::Json(serde_json::json!({ "min": value.min, "max": value.max }))
    }
}

impl From<EmeterStatus> for FeatureValue {
    fn from(value: EmeterStatus) -> Self {
        Self::Json(Value::Object(value.raw().clone()))
    }
}

impl From<LightState> for FeatureValue {
    fn from(value: LightState) -> Self {
        serde_json::to_value(value).map_or(Self::Null, Self::Json)
    }
}

impl From<Vec<String>> for FeatureValue {
    fn from(value: Vec<String>) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<Value> for FeatureValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl<T: Into<FeatureValue>> From<Option<T>> for FeatureValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl TryFrom<FeatureValue> for bool {
    type Error = ValueError;

    fn try_from(value: FeatureValue) -> Result<Self, Self::Error> {
        value.as_bool().ok_or_else(|| value.mismatch("bool"))
    }
}

impl TryFrom<FeatureValue> for i64 {
    type Error = ValueError;

    // Integral floats come from UI sliders.
    #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
    fn try_from(value: FeatureValue) -> Result<Self, Self::Error> {
        match value {
            FeatureValue::Int(i) => Ok(i),
            FeatureValue::Float(f) if f.fract() == 0.0 => Ok(f as i64),
            other => Err(other.mismatch("int")),
        }
    }
}

impl TryFrom<FeatureValue> for f64 {
    type Error = ValueError;

    fn try_from(value: FeatureValue) -> Result<Self, Self::Error> {
        value.as_f64().ok_or_else(|| value.mismatch("float"))
    }
}

impl TryFrom<FeatureValue> for String {
    type Error = ValueError;

    fn try_from(value: FeatureValue) -> Result<Self, Self::Error> {
        match value {
            FeatureValue::Text(s) => Ok(s),
            other => Err(other.mismatch("text")),
        }
    }
}

impl TryFrom<FeatureValue> for Hsv {
    type Error = ValueError;

    fn try_from(value: FeatureValue) -> Result<Self, Self::Error> {
        match value {
            FeatureValue::Hsv(hsv) => Ok(hsv),
            other => Err(other.mismatch("hsv")),
        }
    }
}
