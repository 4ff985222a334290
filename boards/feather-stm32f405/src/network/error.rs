#![deny(unsafe_code)]
#![deny(warnings)]
//! Network client error types

use defmt::Format;
use relay_core::WsError;

/// TLS session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum TlsError {
    /// Handshake failed (alert, bad record, unsupported cipher suite)
    HandshakeFailed,
    /// Record buffers were already handed to an earlier session
    BuffersInUse,
    /// Peer closed the session
    ConnectionClosed,
}

impl core::fmt::Display for TlsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::HandshakeFailed => write!(f, "TLS handshake failed"),
            Self::BuffersInUse => write!(f, "TLS buffers already in use"),
            Self::ConnectionClosed => write!(f, "TLS connection closed"),
        }
    }
}

impl core::error::Error for TlsError {}

/// Network client operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum NetworkError {
    /// W5500 did not come up
    EthernetInit,
    /// DNS resolution failed
    DnsError,
    /// Socket bind/connect error
    SocketError,
    /// Request timeout
    Timeout,
    /// Invalid response from server
    InvalidResponse,
    /// Server error (e.g., invalid stratum for NTP)
    ServerError,
    /// All configured servers failed
    AllServersFailed,
    /// TLS layer failed
    Tls(TlsError),
    /// WebSocket layer failed
    WebSocket(WsError),
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EthernetInit => write!(f, "Ethernet initialization failed"),
            Self::DnsError => write!(f, "DNS resolution failed"),
            Self::SocketError => write!(f, "Socket error"),
            Self::Timeout => write!(f, "Request timeout"),
            Self::InvalidResponse => write!(f, "Invalid response"),
            Self::ServerError => write!(f, "Server error"),
            Self::AllServersFailed => write!(f, "All servers failed"),
            Self::Tls(e) => write!(f, "{}", e),
            Self::WebSocket(e) => write!(f, "WebSocket: {}", e),
        }
    }
}

// Implement core::error::Error for no_std compatibility
impl core::error::Error for NetworkError {}

impl From<TlsError> for NetworkError {
    fn from(e: TlsError) -> Self {
        Self::Tls(e)
    }
}

impl From<WsError> for NetworkError {
    fn from(e: WsError) -> Self {
        Self::WebSocket(e)
    }
}

impl embedded_io_async::Error for NetworkError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::SocketError | Self::Tls(TlsError::ConnectionClosed) => {
                embedded_io_async::ErrorKind::BrokenPipe
            }
            Self::Timeout => embedded_io_async::ErrorKind::TimedOut,
            Self::InvalidResponse => embedded_io_async::ErrorKind::InvalidData,
            _ => embedded_io_async::ErrorKind::Other,
        }
    }
}
