#![deny(unsafe_code)]
#![deny(warnings)]
//! Async TCP socket wrapper
//!
//! This module provides an async wrapper around `embassy_net::tcp::TcpSocket`
//! that implements the `embedded-io-async` traits required by `embedded-tls`
//! and by the WebSocket client.

use defmt::{error, info, Debug2Format};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpAddress, IpEndpoint, Stack};
use embedded_io_async::{ErrorType, Read, Write};

use super::error::NetworkError;

/// Async TCP socket wrapper implementing embedded-io-async traits
///
/// # Example
///
/// ```no_run
/// let mut socket = AsyncTcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
/// socket.connect(endpoint).await?;
/// // Now socket can be wrapped in TLS or spoken to directly
/// ```
pub struct AsyncTcpSocket<'a> {
    socket: TcpSocket<'a>,
}

impl<'a> AsyncTcpSocket<'a> {
    /// Create a new async TCP socket
    ///
    /// # Arguments
    ///
    /// * `stack` - Embassy network stack
    /// * `rx_buffer` - Buffer for receiving data (typically 4-8 KB)
    /// * `tx_buffer` - Buffer for transmitting data (typically 4-8 KB)
    pub fn new(stack: Stack<'a>, rx_buffer: &'a mut [u8], tx_buffer: &'a mut [u8]) -> Self {
        Self {
            socket: TcpSocket::new(stack, rx_buffer, tx_buffer),
        }
    }

    /// Connect to a remote endpoint
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::SocketError` if connection fails
    pub async fn connect(&mut self, endpoint: IpEndpoint) -> Result<(), NetworkError> {
        self.socket.connect(endpoint).await.map_err(|e| {
            error!("TCP connect to {} failed: {:?}", Debug2Format(&endpoint), e);
            NetworkError::SocketError
        })
    }

    /// Close the socket
    pub fn close(&mut self) {
        self.socket.close();
    }
}

/// Resolve `host` to its first IPv4 address
pub async fn resolve(stack: &Stack<'_>, host: &str) -> Result<IpAddress, NetworkError> {
    stack
        .dns_query(host, DnsQueryType::A)
        .await
        .map_err(|e| {
            error!("DNS query for {} failed: {:?}", host, Debug2Format(&e));
            NetworkError::DnsError
        })?
        .first()
        .copied()
        .ok_or_else(|| {
            error!("DNS returned no results for {}", host);
            NetworkError::DnsError
        })
}

/// Resolve `host` and open a TCP connection to it
///
/// # Arguments
///
/// * `stack` - Embassy network stack
/// * `host` - Hostname or dotted IPv4 address
/// * `port` - Remote port
/// * `rx_buffer`, `tx_buffer` - Socket buffers; they bound the socket's lifetime
pub async fn connect<'a>(
    stack: Stack<'a>,
    host: &str,
    port: u16,
    rx_buffer: &'a mut [u8],
    tx_buffer: &'a mut [u8],
) -> Result<AsyncTcpSocket<'a>, NetworkError> {
    let addr = resolve(&stack, host).await?;
    let endpoint = IpEndpoint::new(addr, port);
    info!("Resolved {} to {}", host, Debug2Format(&endpoint));

    let mut socket = AsyncTcpSocket::new(stack, rx_buffer, tx_buffer);
    socket.connect(endpoint).await?;
    info!("TCP connection established to {}", Debug2Format(&endpoint));
    Ok(socket)
}

impl ErrorType for AsyncTcpSocket<'_> {
    type Error = NetworkError;
}

impl Read for AsyncTcpSocket<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.socket
            .read(buf)
            .await
            .map_err(|_| NetworkError::SocketError)
    }
}

impl Write for AsyncTcpSocket<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.socket
            .write(buf)
            .await
            .map_err(|_| NetworkError::SocketError)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.socket
            .flush()
            .await
            .map_err(|_| NetworkError::SocketError)
    }
}
