#![deny(unsafe_code)]
#![deny(warnings)]
//! Relay sequence: connect, register, read once, forward, then listen
//!
//! One pass only. Every failure is logged and ends the pass; nothing is
//! retried and nothing reconnects.

use defmt::{error, info, warn};
use embassy_net::Stack;
use embedded_io_async::{Read, Write};
use rand_core::{CryptoRng, RngCore};
use relay_core::{Delivery, Endpoint, RelayConfig, TelemetryLink, WsClient, WsEvent};
use relay_hal::TemperatureSensor;

use crate::clock::SyncedClock;
use crate::network::{socket, tls, NetworkError, SntpClient};

/// TCP socket buffer sizes
const TCP_RX_LEN: usize = 4096;
const TCP_TX_LEN: usize = 4096;

/// WebSocket receive buffer; half of it bounds an inbound message
const WS_RX_LEN: usize = 2048;

/// WebSocket send buffer; fits the upgrade request and the registration
const WS_TX_LEN: usize = 1024;

/// Run the relay once over `stack`
///
/// # Arguments
///
/// * `stack` - Configured network stack
/// * `config` - Endpoint and device identity
/// * `sensor` - Temperature sensor, read exactly once
/// * `rng` - Hardware RNG for TLS and WebSocket masking
pub async fn run<S, R>(stack: Stack<'static>, config: RelayConfig, sensor: &mut S, rng: &mut R)
where
    S: TemperatureSensor,
    R: RngCore + CryptoRng,
{
    let mut clock = SyncedClock::unsynced();
    match SntpClient::new().sync(&stack).await {
        Ok(timestamp) => clock.calibrate(timestamp),
        Err(e) => warn!("SNTP failed ({}); timestamps count from boot", e),
    }
    if !clock.is_synced() {
        warn!("Wall clock not synchronized");
    }

    let mut link = TelemetryLink::new(config, clock);
    let Some(endpoint) = link.start() else {
        return;
    };

    let mut tcp_rx = [0u8; TCP_RX_LEN];
    let mut tcp_tx = [0u8; TCP_TX_LEN];
    let tcp = match socket::connect(stack, endpoint.host, endpoint.port, &mut tcp_rx, &mut tcp_tx).await {
        Ok(tcp) => tcp,
        Err(e) => {
            error!("Socket open failed: {}", e);
            link.on_closed();
            return;
        }
    };

    if endpoint.secure {
        let session = match tls::open(tcp, endpoint.host, rng).await {
            Ok(session) => session,
            Err(e) => {
                error!("Socket open failed: {}", NetworkError::from(e));
                link.on_closed();
                return;
            }
        };
        if let Some(session) = serve(&mut link, session, &endpoint, sensor, rng).await {
            if let Err(e) = tls::close(session).await {
                warn!("{}", e);
            }
        }
    } else if let Some(mut tcp) = serve(&mut link, tcp, &endpoint, sensor, rng).await {
        tcp.close();
    }

    info!("Relay pass complete (link {:?}, ready={})", link.state(), link.is_ready());
}

/// Upgrade `io` to a WebSocket and run the session until the peer closes
///
/// Returns the stream when it is still worth closing politely.
async fn serve<T, S, R, C>(
    link: &mut TelemetryLink<C>,
    io: T,
    endpoint: &Endpoint,
    sensor: &mut S,
    rng: &mut R,
) -> Option<T>
where
    T: Read + Write,
    S: TemperatureSensor,
    R: RngCore,
    C: relay_hal::WallClock,
{
    let mut ws_rx = [0u8; WS_RX_LEN];
    let mut ws_tx = [0u8; WS_TX_LEN];
    let mut ws = match WsClient::connect(io, rng, endpoint, &mut ws_rx, &mut ws_tx).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("Socket open failed: {}", NetworkError::from(e));
            link.on_closed();
            return None;
        }
    };

    link.on_open(&mut ws).await;

    match sensor.read_celsius() {
        Ok(value) => {
            info!("Temperature: {} °C", value);
            if link.send_data(&mut ws, value).await != Delivery::Sent {
                warn!("Reading not delivered");
            }
        }
        Err(e) => error!("Sensor read failed: {:?}", defmt::Debug2Format(&e)),
    }

    let peer_closed = loop {
        match ws.next_event().await {
            Ok(WsEvent::Text(text)) => link.on_message(text),
            Ok(WsEvent::Binary(bytes)) => info!("Ignoring {} byte binary message", bytes.len()),
            Ok(WsEvent::Closed(code)) => {
                info!("Peer closed the socket (code {:?})", code);
                break true;
            }
            Err(e) => {
                warn!("Socket error: {}", NetworkError::from(e));
                break false;
            }
        }
    };
    link.on_closed();

    if !peer_closed {
        if let Err(e) = ws.close().await {
            warn!("Close frame not sent: {}", NetworkError::from(e));
        }
    }
    Some(ws.into_inner())
}
