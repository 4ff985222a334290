#![deny(unsafe_code)]
#![deny(warnings)]
//! SNTP client (RFC 5905 client mode over UDP/123)
//!
//! - Multi-server fallback with retries
//! - Stratum validation
//! - RTT/2 correction of the server's transmit timestamp

use defmt::{error, info, warn, Debug2Format};
use embassy_futures::select::{select, Either};
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{Duration, Instant, Timer};
use rtic_monotonics::fugit::ExtU64;
use rtic_monotonics::Monotonic;

use relay_core::Timestamp;

use crate::Mono;

use super::config::SntpConfig;
use super::error::NetworkError;
use super::socket::resolve;

/// NTP port
const NTP_PORT: u16 = 123;

/// NTP packet size without extensions
const NTP_PACKET_LEN: usize = 48;

/// SNTP client for time synchronization
pub struct SntpClient {
    config: SntpConfig,
}

impl SntpClient {
    /// Create a new SNTP client with default configuration
    pub fn new() -> Self {
        Self::with_config(SntpConfig::default())
    }

    /// Create a new SNTP client with custom configuration
    pub fn with_config(config: SntpConfig) -> Self {
        Self { config }
    }

    /// Try every server until one answers with a usable timestamp
    pub async fn sync(&self, stack: &Stack<'static>) -> Result<Timestamp, NetworkError> {
        info!("Starting SNTP synchronization");
        for server in self.config.servers {
            for attempt in 0..self.config.retry_count {
                info!(
                    "Attempting SNTP sync with {} (attempt {})",
                    server,
                    attempt + 1
                );
                match self.sntp_request(stack, server).await {
                    Ok(timestamp) => return Ok(timestamp),
                    Err(e) => {
                        warn!("SNTP sync failed: {:?}, retrying...", e);
                        Mono::delay(2000_u64.millis()).await;
                    }
                }
            }
        }
        error!("All SNTP sync attempts failed");
        Err(NetworkError::AllServersFailed)
    }

    async fn sntp_request(
        &self,
        stack: &Stack<'static>,
        server: &str,
    ) -> Result<Timestamp, NetworkError> {
        let server_ip = resolve(stack, server).await?;
        let server_endpoint = IpEndpoint::new(server_ip, NTP_PORT);
        info!("Resolved {} to {}", server, Debug2Format(&server_endpoint));

        let mut rx_meta = [PacketMetadata::EMPTY; 2];
        let mut rx_buffer = [0u8; 64];
        let mut tx_meta = [PacketMetadata::EMPTY; 2];
        let mut tx_buffer = [0u8; 64];
        let mut socket = UdpSocket::new(
            *stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| NetworkError::SocketError)?;

        // LI=0, VN=3, Mode=3 (client)
        let mut request = [0u8; NTP_PACKET_LEN];
        request[0] = 0x1B;
        let transmit_time = Instant::now();
        socket
            .send_to(&request, server_endpoint)
            .await
            .map_err(|_| NetworkError::SocketError)?;

        let mut response = [0u8; NTP_PACKET_LEN];
        let timeout = Timer::after(Duration::from_millis(self.config.timeout_ms));
        let (recv_len, from_addr) = match select(timeout, socket.recv_from(&mut response)).await {
            Either::First(_) => return Err(NetworkError::Timeout),
            Either::Second(result) => result.map_err(|_| NetworkError::SocketError)?,
        };
        let receive_time = Instant::now();

        if recv_len < NTP_PACKET_LEN || from_addr.endpoint.addr != server_ip {
            return Err(NetworkError::InvalidResponse);
        }

        let stratum = response[1];
        if stratum == 0 || stratum > self.config.max_stratum {
            warn!(
                "Invalid stratum {} (max {})",
                stratum, self.config.max_stratum
            );
            return Err(NetworkError::ServerError);
        }

        let tx_secs =
            u32::from_be_bytes([response[40], response[41], response[42], response[43]]);
        let tx_frac =
            u32::from_be_bytes([response[44], response[45], response[46], response[47]]);

        let rtt_correction_micros = receive_time.duration_since(transmit_time).as_micros() / 2;
        let timestamp =
            Timestamp::from_ntp(u64::from(tx_secs), tx_frac).add_micros(rtt_correction_micros);

        info!(
            "NTP timestamp: {}.{:06} UTC (stratum {}, RTT correction: {} µs)",
            timestamp.unix_secs, timestamp.micros, stratum, rtt_correction_micros
        );
        Ok(timestamp)
    }
}

impl Default for SntpClient {
    fn default() -> Self {
        Self::new()
    }
}
