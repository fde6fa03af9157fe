// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `kasalink` - A Rust library to control TP-Link Kasa and Tapo devices.
//!
//! Devices are driven over the local network through one of two protocol
//! families:
//!
//! - **IOT**: the legacy namespace/method protocol of Kasa plugs, bulbs,
//!   strips and switches ([`iot::Iot`])
//! - **SMART**: the structured method protocol of Tapo and newer Kasa
//!   devices, which negotiates a component list ([`smart::Smart`])
//!
//! # Architecture
//!
//! A [`Device`] owns a set of [`Module`]s, each one unit of functionality
//! (energy metering, light control, a motion sensor). Every refresh cycle
//! collects the modules' queries into one request, performs a single round
//! trip, routes each module its slice of the response and finally lets
//! modules recompute derived state. A cycle either commits completely or
//! leaves the previous state untouched.
//!
//! Modules expose typed [`Feature`]s, which give uniform named access to
//! their values, ranges, choices and setters. Setters never update cached
//! state; the new value is visible after the next [`Device::update`].
//!
//! # Quick Start
//!
//! ```no_run
//! use kasalink::{Device, DeviceConfig};
//! use kasalink::iot::Iot;
//!
//! #[tokio::main]
//! async fn main() -> kasalink::Result<()> {
//!     let device = Device::<Iot>::connect(DeviceConfig::new("192.168.1.100")).await?;
//!     println!("{device}");
//!
//!     if let Some(energy) = device.energy() {
//!         println!("{:?} W", energy.current_consumption()?);
//!     }
//!
//!     device.turn_on().await?;
//!     device.update().await?;
//!     assert!(device.is_on()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Offline fixtures
//!
//! ```
//! use std::sync::Arc;
//! use kasalink::{Device, DeviceConfig, ProtocolFamily};
//! use kasalink::smart::Smart;
//! use kasalink::transport::MemoryTransport;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> kasalink::Result<()> {
//! let transport = Arc::new(MemoryTransport::new(
//!     ProtocolFamily::Smart,
//!     json!({
//!         "component_nego": {"component_list": [{"id": "device", "ver_code": 1}]},
//!         "get_device_info": {
//!             "device_id": "80",
//!             "model": "P100",
//!             "type": "SMART.TAPOPLUG",
//!             "device_on": true
//!         }
//!     }),
//! ));
//! let device = Device::<Smart>::builder(DeviceConfig::new("127.0.0.1"), transport)
//!     .build()
//!     .await?;
//! assert!(device.is_on()?);
//! assert_eq!(device.model()?, "P100");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod family;
pub mod feature;
pub mod interfaces;
pub mod iot;
pub mod module;
pub mod smart;
pub mod transport;
pub mod types;

pub use config::{DeviceConfig, ProtocolFamily};
pub use device::{Device, DeviceBuilder, DeviceHandle, Snapshot};
pub use error::{
    ConfigurationError, DeviceError, Error, ParseError, Result, TransportError, ValueError,
};
pub use family::{Family, ModuleDescriptor};
pub use feature::{Category, Feature, FeatureMap, FeatureType};
pub use module::{CyclePhase, Module, ModuleBase};
pub use types::{DeviceType, FeatureValue};
