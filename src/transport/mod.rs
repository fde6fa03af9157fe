// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transports carrying requests to a device and responses back.
//!
//! The module system treats requests and responses as JSON objects and
//! leaves framing, encryption and session handling to a [`Transport`].
//!
//! - [`XorTransport`]: legacy TCP transport with autokey XOR framing
//! - [`MemoryTransport`]: in-memory device backed by a JSON fixture

mod memory;
mod xor;

pub use memory::MemoryTransport;
pub use xor::{XorTransport, decrypt, encrypt};

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::TransportError;

/// A request: a JSON object keyed by namespace or method name.
pub type Request = Map<String, Value>;

/// A response: a JSON object keyed like the request that produced it.
pub type Response = Map<String, Value>;

/// Performs request/response round trips with one device.
///
/// Implementations own timeouts and reconnection. A failed round trip must
/// return an error rather than a partial response.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends a request and waits for the complete response.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the device cannot be reached, the round
    /// trip times out, or the reply is not a JSON object.
    async fn send(&self, request: &Request) -> Result<Response, TransportError>;

    /// Releases any connection held by the transport.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if shutting down the connection fails.
    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Parses a reply body into a response object.
pub(crate) fn parse_response(body: &[u8]) -> Result<Response, TransportError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(TransportError::InvalidPayload(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(TransportError::InvalidPayload(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_response_requires_object() {
        assert!(parse_response(br#"{"system": {}}"#).is_ok());
        assert!(matches!(
            parse_response(b"[1, 2]"),
            Err(TransportError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_response(b"{not json"),
            Err(TransportError::InvalidPayload(_))
        ));
    }
}
