//! Outbound text message port
//!
//! Abstracts the persistent socket so the connection manager can be driven
//! without a particular transport or executor.

/// Port for transmitting one complete text message
///
/// A successful return means the message was handed to the transport and
/// flushed; there is no delivery acknowledgement.
pub trait TextSink {
    /// Transmission error
    type Error: core::fmt::Debug;

    /// Send `text` as a single message
    fn send_text(
        &mut self,
        text: &str,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;
}
