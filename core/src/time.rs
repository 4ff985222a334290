//! Unix time from NTP and a monotonic counter
//!
//! Works like Linux `CLOCK_REALTIME`: a monotonic microsecond counter plus a
//! Unix offset captured when an SNTP answer arrives. Boards supply the
//! counter; everything here is plain arithmetic.

/// NTP epoch offset (1900-01-01 to 1970-01-01 in seconds)
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Unix time with microsecond resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    /// Seconds since 1970-01-01 00:00:00 UTC
    pub unix_secs: u64,
    /// Microseconds within the second (0-999999)
    pub micros: u32,
}

impl Timestamp {
    pub const fn new(unix_secs: u64, micros: u32) -> Self {
        Self { unix_secs, micros }
    }

    /// Convert an NTP timestamp (seconds + 2^-32 fraction)
    ///
    /// Times before the Unix epoch clamp to zero.
    pub fn from_ntp(ntp_secs: u64, ntp_frac: u32) -> Self {
        let unix_secs = ntp_secs.saturating_sub(NTP_UNIX_OFFSET);
        let micros = ((u64::from(ntp_frac) * 1_000_000) >> 32) as u32;
        Self::new(unix_secs, micros)
    }

    /// Shift forward by `micros`, carrying into seconds
    pub fn add_micros(self, micros: u64) -> Self {
        let total = self.as_micros().saturating_add(micros);
        Self::new(total / 1_000_000, (total % 1_000_000) as u32)
    }

    pub const fn as_micros(&self) -> u64 {
        self.unix_secs * 1_000_000 + self.micros as u64
    }
}

/// Anchor between the monotonic counter and Unix time
///
/// Until [`calibrate`](Self::calibrate) is called the offset is zero, so
/// time counts from the Unix epoch starting at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    base_unix_micros: u64,
    base_mono_micros: u64,
    synced: bool,
}

impl Calibration {
    pub const fn unsynced() -> Self {
        Self {
            base_unix_micros: 0,
            base_mono_micros: 0,
            synced: false,
        }
    }

    /// Record that `timestamp` was true at monotonic time `mono_micros`
    pub fn calibrate(&mut self, timestamp: Timestamp, mono_micros: u64) {
        self.base_unix_micros = timestamp.as_micros();
        self.base_mono_micros = mono_micros;
        self.synced = true;
        info!(
            "Wall clock calibrated: {}.{:06} UTC at mono={} us",
            timestamp.unix_secs,
            timestamp.micros,
            mono_micros
        );
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Unix microseconds at monotonic time `mono_micros`
    pub fn unix_micros_at(&self, mono_micros: u64) -> u64 {
        self.base_unix_micros
            .saturating_add(mono_micros.wrapping_sub(self.base_mono_micros))
    }

    /// Unix milliseconds at monotonic time `mono_micros`
    pub fn unix_millis_at(&self, mono_micros: u64) -> u64 {
        self.unix_micros_at(mono_micros) / 1_000
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::unsynced()
    }
}
