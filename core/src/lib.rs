//! Platform-agnostic core of the temperature relay
//!
//! This crate holds everything that does not touch hardware: configuration,
//! the sensor frame format, message envelopes, NTP time arithmetic, a
//! WebSocket session over any `embedded-io-async` stream, and the
//! [`TelemetryLink`] state machine that registers the device and forwards
//! readings.
//!
//! It is `no_std` and builds for the host, where the unit tests run with the
//! `log` backend. Firmware enables the `defmt` feature instead.
//!
//! # Example
//!
//! ```ignore
//! let mut link = TelemetryLink::new(config, clock);
//! if let Some(endpoint) = link.start() {
//!     let mut ws = WsClient::connect(tls, rng, &endpoint, &mut rx, &mut tx).await?;
//!     link.on_open(&mut ws).await;
//!     link.send_data(&mut ws, sensor.read_celsius()?).await;
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

// Must come first so the logging macros are visible to the other modules
#[macro_use]
mod fmt;

pub mod config;
pub mod link;
pub mod message;
pub mod reading;
pub mod time;
pub mod ws;

pub use config::{DeviceIdentity, Endpoint, RelayConfig, SensorConfig};
pub use link::{Connection, Delivery, LinkEvent, LinkState, TelemetryLink};
pub use reading::{Reading, SensorFrame, ThermistorSensor};
pub use time::{Calibration, Timestamp};
pub use ws::{WsClient, WsError, WsEvent};
