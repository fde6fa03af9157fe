// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory device backed by a JSON fixture.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use super::{Request, Response, Transport};
use crate::config::ProtocolFamily;
use crate::error::TransportError;

#[derive(Debug, Default)]
struct MemoryState {
    fixture: Map<String, Value>,
    requests: Vec<Request>,
    fail_next: usize,
    closed: bool,
}

/// A transport answering from a JSON fixture instead of a network device.
///
/// The fixture has the shape of a full response:
///
/// - legacy family: `{namespace: {method: result}}`; any method missing
///   from the fixture answers with a non-zero `err_code` if it is a `get_`
///   method and with `{"err_code": 0}` otherwise
/// - structured family: `{method: result}`; a `set_x` call merges its
///   parameters into the `get_x` entry, a missing `get_` method answers
///   with a non-zero `error_code`, other methods answer `{}`
///
/// Every request is recorded and failures can be injected, which makes the
/// transport suitable for exercising refresh cycles in tests.
///
/// # Examples
///
/// ```
/// use kasalink::transport::{MemoryTransport, Transport};
/// use kasalink::ProtocolFamily;
/// use serde_json::json;
///
/// # async fn example() {
/// let transport = MemoryTransport::new(
///     ProtocolFamily::Smart,
///     json!({"get_device_info": {"device_on": true}}),
/// );
/// let request = json!({"get_device_info": null});
/// let response = transport
///     .send(request.as_object().unwrap())
///     .await
///     .unwrap();
/// assert_eq!(response["get_device_info"]["device_on"], true);
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryTransport {
    family: ProtocolFamily,
    state: Mutex<MemoryState>,
}

impl MemoryTransport {
    /// Error code returned for unknown structured methods.
    pub const UNKNOWN_METHOD: i64 = -10008;

    /// Creates a transport answering from `fixture`.
    ///
    /// A fixture that is not a JSON object is treated as empty.
    #[must_use]
    pub fn new(family: ProtocolFamily, fixture: Value) -> Self {
        let fixture = match fixture {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            family,
            state: Mutex::new(MemoryState {
                fixture,
                ..MemoryState::default()
            }),
        }
    }

    /// Makes the next `count` round trips fail with a connection error.
    pub fn fail_next(&self, count: usize) {
        self.state.lock().fail_next = count;
    }

    /// Edits the fixture, simulating a change on the device.
    pub fn modify(&self, edit: impl FnOnce(&mut Map<String, Value>)) {
        edit(&mut self.state.lock().fixture);
    }

    /// Returns a copy of the current fixture.
    #[must_use]
    pub fn fixture(&self) -> Map<String, Value> {
        self.state.lock().fixture.clone()
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    /// Returns the most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<Request> {
        self.state.lock().requests.last().cloned()
    }

    fn answer_smart(fixture: &mut Map<String, Value>, request: &Request) -> Response {
        let mut response = Response::new();
        for (method, params) in request {
            let result = if let Some(target) = method.strip_prefix("set_") {
                if let (Some(Value::Object(current)), Value::Object(update)) =
                    (fixture.get_mut(&format!("get_{target}")), params)
                {
                    for (key, value) in update {
                        current.insert(key.clone(), value.clone());
                    }
                }
                json!({})
            } else if let Some(result) = fixture.get(method) {
                result.clone()
            } else if method.starts_with("get_") || method == "component_nego" {
                json!({ "error_code": Self::UNKNOWN_METHOD })
            } else {
                json!({})
            };
            response.insert(method.clone(), result);
        }
        response
    }

    fn answer_iot(fixture: &Map<String, Value>, request: &Request) -> Response {
        let mut response = Response::new();
        for (namespace, methods) in request {
            let mut section = Map::new();
            for method in methods.as_object().into_iter().flat_map(Map::keys) {
                let result = fixture
                    .get(namespace)
                    .and_then(|ns| ns.get(method))
                    .cloned()
                    .unwrap_or_else(|| {
                        if method.starts_with("get_") {
                            json!({ "err_code": -1, "err_msg": "module not support" })
                        } else {
                            json!({ "err_code": 0 })
                        }
                    });
                section.insert(method.clone(), result);
            }
            response.insert(namespace.clone(), Value::Object(section));
        }
        response
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        state.requests.push(request.clone());
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(TransportError::ConnectionFailed(
                "injected failure".to_string(),
            ));
        }
        let response = match self.family {
            ProtocolFamily::Iot => Self::answer_iot(&state.fixture, request),
            ProtocolFamily::Smart => Self::answer_smart(&mut state.fixture, request),
        };
        tracing::trace!(keys = response.len(), "Answered from fixture");
        Ok(response)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.state.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(value: Value) -> Request {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn smart_set_merges_into_get() {
        let transport = MemoryTransport::new(
            ProtocolFamily::Smart,
            json!({"get_device_info": {"brightness": 50, "device_on": true}}),
        );
        transport
            .send(&request(json!({"set_device_info": {"brightness": 80}})))
            .await
            .unwrap();
        let response = transport
            .send(&request(json!({"get_device_info": null})))
            .await
            .unwrap();
        assert_eq!(response["get_device_info"]["brightness"], 80);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn smart_unknown_get_reports_error_code() {
        let transport = MemoryTransport::new(ProtocolFamily::Smart, json!({}));
        let response = transport
            .send(&request(json!({"get_fan_info": null})))
            .await
            .unwrap();
        assert_eq!(
            response["get_fan_info"]["error_code"],
            MemoryTransport::UNKNOWN_METHOD
        );
    }

    #[tokio::test]
    async fn iot_answers_per_namespace() {
        let transport = MemoryTransport::new(
            ProtocolFamily::Iot,
            json!({"system": {"get_sysinfo": {"alias": "lamp"}}}),
        );
        let response = transport
            .send(&request(json!({
                "system": {"get_sysinfo": {}},
                "emeter": {"get_realtime": {}},
            })))
            .await
            .unwrap();
        assert_eq!(response["system"]["get_sysinfo"]["alias"], "lamp");
        assert_eq!(response["emeter"]["get_realtime"]["err_code"], -1);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let transport = MemoryTransport::new(ProtocolFamily::Smart, json!({}));
        transport.fail_next(1);
        let req = request(json!({"get_device_info": null}));
        assert!(transport.send(&req).await.is_err());
        assert!(transport.send(&req).await.is_ok());
    }

    #[tokio::test]
    async fn closed_transport_rejects_requests() {
        let transport = MemoryTransport::new(ProtocolFamily::Iot, json!({}));
        transport.close().await.unwrap();
        let req = request(json!({"system": {"get_sysinfo": {}}}));
        assert!(matches!(
            transport.send(&req).await,
            Err(TransportError::Closed)
        ));
    }
}
