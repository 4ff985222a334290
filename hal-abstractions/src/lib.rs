//! Hardware abstraction traits for the temperature relay firmware
//!
//! This crate defines the seams between the platform-agnostic relay logic
//! and the board. BSPs implement these traits; host tests implement them
//! with in-memory doubles.

#![no_std]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod clock;
pub mod sensor;
pub mod sink;

pub use clock::WallClock;
pub use sensor::TemperatureSensor;
pub use sink::TextSink;
