#![deny(unsafe_code)]
#![deny(warnings)]
//! Wall clock backed by the TIM2 monotonic
//!
//! `CLOCK_MONOTONIC` is TIM2 at 1 MHz; the SNTP offset on top of it lives in
//! a `relay_core::Calibration`.

use relay_core::{Calibration, Timestamp};
use relay_hal::WallClock;
use rtic_monotonics::Monotonic;

use crate::Mono;

/// SNTP-calibrated wall clock
pub struct SyncedClock {
    calibration: Calibration,
}

impl SyncedClock {
    pub const fn unsynced() -> Self {
        Self {
            calibration: Calibration::unsynced(),
        }
    }

    /// Anchor the clock to an SNTP answer received just now
    pub fn calibrate(&mut self, timestamp: Timestamp) {
        self.calibration.calibrate(timestamp, mono_micros());
    }

    pub fn is_synced(&self) -> bool {
        self.calibration.is_synced()
    }
}

impl WallClock for SyncedClock {
    fn now_millis(&mut self) -> u64 {
        self.calibration.unix_millis_at(mono_micros())
    }
}

/// TIM2 ticks are microseconds
fn mono_micros() -> u64 {
    Mono::now().ticks()
}
