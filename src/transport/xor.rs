// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Legacy TCP transport.
//!
//! Each message is a 4-byte big-endian length followed by the JSON payload
//! obfuscated with an autokey XOR cipher whose initial key is 171.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::{Request, Response, Transport, parse_response};
use crate::config::DeviceConfig;
use crate::error::TransportError;

const INITIAL_KEY: u8 = 171;

/// Largest reply accepted from a device.
const MAX_REPLY_LEN: usize = 1 << 20;

/// Encrypts a payload and prefixes it with its length.
#[must_use]
pub fn encrypt(payload: &[u8]) -> Vec<u8> {
    let len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.extend_from_slice(&len.to_be_bytes());
    let mut key = INITIAL_KEY;
    for &byte in payload {
        key ^= byte;
        out.push(key);
    }
    out
}

/// Decrypts a payload without its length prefix.
#[must_use]
pub fn decrypt(ciphertext: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    ciphertext
        .iter()
        .map(|&byte| {
            let plain = key ^ byte;
            key = byte;
            plain
        })
        .collect()
}

/// Legacy transport over a persistent TCP connection.
///
/// The connection is opened lazily and dropped after any failure so the
/// next request reconnects.
#[derive(Debug)]
pub struct XorTransport {
    host: String,
    port: u16,
    timeout: Duration,
    stream: Mutex<Option<TcpStream>>,
}

impl XorTransport {
    /// Creates a transport for the configured host.
    #[must_use]
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            host: config.host().to_string(),
            port: config.port(),
            timeout: config.timeout(),
            stream: Mutex::new(None),
        }
    }

    async fn exchange(
        &self,
        stream: &mut TcpStream,
        request: &Request,
    ) -> Result<Response, TransportError> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| TransportError::InvalidPayload(e.to_string()))?;
        stream.write_all(&encrypt(&payload)).await?;

        let mut header = [0u8; 4];
        stream.read_exact(&mut header).await?;
        let len = u32::from_be_bytes(header) as usize;
        if len > MAX_REPLY_LEN {
            return Err(TransportError::InvalidPayload(format!(
                "reply of {len} bytes exceeds {MAX_REPLY_LEN}"
            )));
        }
        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).await?;

        let plain = decrypt(&body);
        tracing::debug!(host = %self.host, bytes = len, "Received reply");
        parse_response(&plain)
    }
}

#[async_trait]
impl Transport for XorTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let mut guard = self.stream.lock().await;
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);

        let result = tokio::time::timeout(self.timeout, async {
            if guard.is_none() {
                tracing::debug!(host = %self.host, port = self.port, "Connecting");
                let stream = TcpStream::connect((self.host.as_str(), self.port))
                    .await
                    .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
                *guard = Some(stream);
            }
            match guard.as_mut() {
                Some(stream) => self.exchange(stream, request).await,
                None => Err(TransportError::Closed),
            }
        })
        .await
        .unwrap_or(Err(TransportError::Timeout(timeout_ms)));

        if result.is_err() {
            *guard = None;
        }
        result
    }

    async fn close(&self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.lock().await.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_known_vector() {
        let encrypted = encrypt(br#"{"a":1}"#);
        assert_eq!(&encrypted[..4], &[0, 0, 0, 7]);
        // '{' (0x7b) ^ 171 (0xab) = 0xd0
        assert_eq!(encrypted[4], 0xd0);
    }

    #[test]
    fn decrypt_reverses_encrypt() {
        let payload = br#"{"system":{"get_sysinfo":{}}}"#;
        let encrypted = encrypt(payload);
        assert_eq!(decrypt(&encrypted[4..]), payload.to_vec());
    }
}
