//! Temperature sensor port
//!
//! The relay reads exactly one value per run, synchronously, before it
//! forwards anything. Implementations talk to whatever bus the board has.

/// Port for reading a temperature in degrees Celsius
///
/// # Example Implementation
///
/// ```ignore
/// struct OnboardSensor { adc: Adc<'static, Blocking> }
///
/// impl TemperatureSensor for OnboardSensor {
///     type Error = AdcError;
///
///     fn read_celsius(&mut self) -> Result<f32, Self::Error> {
///         let raw = self.adc.blocking_read(&mut self.channel);
///         Ok(convert(raw))
///     }
/// }
/// ```
pub trait TemperatureSensor {
    /// Error returned by the underlying bus
    type Error: core::fmt::Debug;

    /// Perform one blocking read and return the temperature in °C
    fn read_celsius(&mut self) -> Result<f32, Self::Error>;
}

impl<T: TemperatureSensor + ?Sized> TemperatureSensor for &mut T {
    type Error = T::Error;

    fn read_celsius(&mut self) -> Result<f32, Self::Error> {
        T::read_celsius(self)
    }
}
