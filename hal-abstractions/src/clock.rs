//! Wall-clock time source

/// Source of Unix epoch time in milliseconds
///
/// Used for reading capture timestamps and correlation ids. Boards back
/// this with SNTP-calibrated monotonic time; tests use a stepping counter.
pub trait WallClock {
    /// Milliseconds since 1970-01-01 00:00:00 UTC
    fn now_millis(&mut self) -> u64;
}

impl<T: WallClock + ?Sized> WallClock for &mut T {
    fn now_millis(&mut self) -> u64 {
        T::now_millis(self)
    }
}
