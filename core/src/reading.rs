//! Temperature readings and the thermistor coprocessor frame
//!
//! The sensor is an analog coprocessor running a thermistor front end. It
//! exposes its latest measurement as a six-byte packed little-endian EZI2C
//! buffer:
//!
//! | Offset | Type | Field |
//! |--------|------|-------|
//! | 0 | i16 | thermistor voltage (filtered ADC counts) |
//! | 2 | u16 | thermistor resistance in ohms |
//! | 4 | i16 | temperature in hundredths of a degree Celsius |
//!
//! Reading the buffer is one I2C write-read: the sub-address byte, then the
//! six frame bytes.

use core::fmt;

use embedded_hal::i2c::I2c;
use relay_hal::{TemperatureSensor, WallClock};

use crate::config::SensorConfig;

/// Size of the coprocessor's EZI2C buffer
pub const FRAME_LEN: usize = 6;

/// One temperature value with its capture time
///
/// Lives only for the duration of one send.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Temperature in °C
    pub value: f32,
    /// Capture time in Unix epoch milliseconds
    pub captured_at_ms: u64,
}

impl Reading {
    /// Create a reading with an explicit timestamp
    pub const fn new(value: f32, captured_at_ms: u64) -> Self {
        Self {
            value,
            captured_at_ms,
        }
    }

    /// Stamp `value` with the current wall-clock time
    pub fn capture<C: WallClock>(value: f32, clock: &mut C) -> Self {
        Self::new(value, clock.now_millis())
    }
}

/// Decoded coprocessor frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorFrame {
    /// Filtered voltage across the thermistor (ADC counts)
    pub thermistor_counts: i16,
    /// Thermistor resistance in ohms
    pub resistance_ohms: u16,
    /// Temperature in 0.01 °C
    pub centi_celsius: i16,
}

impl SensorFrame {
    /// Decode the packed little-endian buffer
    pub fn decode(raw: &[u8; FRAME_LEN]) -> Self {
        Self {
            thermistor_counts: i16::from_le_bytes([raw[0], raw[1]]),
            resistance_ohms: u16::from_le_bytes([raw[2], raw[3]]),
            centi_celsius: i16::from_le_bytes([raw[4], raw[5]]),
        }
    }

    /// Temperature in °C
    pub fn celsius(&self) -> f32 {
        f32::from(self.centi_celsius) / 100.0
    }
}

/// Sensor bus errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Bus transaction failed (NACK, arbitration loss, timeout)
    Bus(embedded_hal::i2c::ErrorKind),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(kind) => write!(f, "I2C bus error: {}", kind),
        }
    }
}

impl core::error::Error for SensorError {}

/// Thermistor coprocessor on an I2C bus
pub struct ThermistorSensor<I> {
    i2c: I,
    config: SensorConfig,
}

impl<I: I2c> ThermistorSensor<I> {
    /// Wrap a bus; no traffic is generated until the first read
    pub fn new(i2c: I, config: SensorConfig) -> Self {
        Self { i2c, config }
    }

    /// Read and decode one raw frame
    pub fn read_frame(&mut self) -> Result<SensorFrame, SensorError> {
        let mut raw = [0u8; FRAME_LEN];
        self.i2c
            .write_read(self.config.i2c_address, &[self.config.offset], &mut raw)
            .map_err(|e| {
                let kind = embedded_hal::i2c::Error::kind(&e);
                error!("Sensor read at address {} failed: {:?}", self.config.i2c_address, kind);
                SensorError::Bus(kind)
            })?;

        let frame = SensorFrame::decode(&raw);
        debug!(
            "Sensor frame: counts={} resistance={} centi_c={}",
            frame.thermistor_counts,
            frame.resistance_ohms,
            frame.centi_celsius
        );
        Ok(frame)
    }

    /// Release the bus
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> TemperatureSensor for ThermistorSensor<I> {
    type Error = SensorError;

    fn read_celsius(&mut self) -> Result<f32, Self::Error> {
        self.read_frame().map(|frame| frame.celsius())
    }
}
