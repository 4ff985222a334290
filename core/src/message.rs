//! Cloud channel message envelopes
//!
//! Two messages exist: the registration control message sent once after the
//! socket opens, and the data message carrying one temperature reading.
//!
//! ```text
//! {"type":"register","sdid":"<id>","Authorization":"bearer <token>","cid":"<millis>"}
//! {"sdid":"<id>","ts":<millis>,"data":{"currentTemp":<float>},"cid":"<millis>"}
//! ```
//!
//! Both are serialized with `serde-json-core` into fixed-capacity strings, so
//! escaping of identifiers and tokens is handled by the serializer.

use core::fmt::{self, Write};

use heapless::String;
use serde::Serialize;

use crate::config::{DeviceIdentity, MAX_TOKEN_LEN};
use crate::reading::Reading;

/// Capacity of an encoded registration message
pub const REGISTER_MESSAGE_LEN: usize = 512;

/// Capacity of an encoded data message
pub const DATA_MESSAGE_LEN: usize = 256;

/// Digits in `u64::MAX`
const CID_LEN: usize = 20;

/// `"bearer "` plus the longest token
const AUTHORIZATION_LEN: usize = 7 + MAX_TOKEN_LEN;

/// Message encoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageError {
    /// Encoded message does not fit its buffer
    BufferFull,
    /// Reading is NaN or infinite and has no JSON representation
    NonFiniteValue,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferFull => write!(f, "Message buffer full"),
            Self::NonFiniteValue => write!(f, "Reading is not a finite number"),
        }
    }
}

impl core::error::Error for MessageError {}

/// Per-message correlation id
///
/// Derived from the wall clock at the moment the message is built; a new one
/// is taken for every message and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Correlation id for the given epoch milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Raw millisecond value
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Decimal rendering used on the wire
    pub fn to_decimal(&self) -> String<CID_LEN> {
        let mut s = String::new();
        // u64::MAX has exactly CID_LEN digits
        let _ = write!(s, "{}", self.0);
        s
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize)]
struct RegisterMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    sdid: &'a str,
    #[serde(rename = "Authorization")]
    authorization: &'a str,
    cid: &'a str,
}

#[derive(Serialize)]
struct TemperatureData {
    #[serde(rename = "currentTemp")]
    current_temp: f32,
}

#[derive(Serialize)]
struct DataMessage<'a> {
    sdid: &'a str,
    ts: u64,
    data: TemperatureData,
    cid: &'a str,
}

/// Encode the registration control message
pub fn encode_register(
    identity: &DeviceIdentity,
    cid: CorrelationId,
) -> Result<String<REGISTER_MESSAGE_LEN>, MessageError> {
    let mut authorization = String::<AUTHORIZATION_LEN>::new();
    write!(authorization, "bearer {}", identity.token()).map_err(|_| MessageError::BufferFull)?;
    let cid = cid.to_decimal();

    let message = RegisterMessage {
        kind: "register",
        sdid: identity.sdid(),
        authorization: &authorization,
        cid: &cid,
    };
    serde_json_core::to_string(&message).map_err(|_| MessageError::BufferFull)
}

/// Encode the data message for one reading
pub fn encode_data(
    identity: &DeviceIdentity,
    reading: &Reading,
    cid: CorrelationId,
) -> Result<String<DATA_MESSAGE_LEN>, MessageError> {
    if !reading.value.is_finite() {
        return Err(MessageError::NonFiniteValue);
    }
    let cid = cid.to_decimal();

    let message = DataMessage {
        sdid: identity.sdid(),
        ts: reading.captured_at_ms,
        data: TemperatureData {
            current_temp: reading.value,
        },
        cid: &cid,
    };
    serde_json_core::to_string(&message).map_err(|_| MessageError::BufferFull)
}
