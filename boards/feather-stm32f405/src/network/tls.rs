#![deny(unsafe_code)]
#![deny(warnings)]
//! TLS 1.3 client using embedded-tls
//!
//! # Limitations
//!
//! - Certificate verification is disabled (`NoVerify`); the server is
//!   authenticated by nothing but DNS
//! - Single session per boot: the record buffers are static and handed out
//!   once
//!
//! # Memory Usage
//!
//! - TLS read buffer: 18 KB in main SRAM
//!   (16384 plaintext + 5 header + 16 AEAD tag, rounded up)
//! - TLS write buffer: 16 KB in main SRAM
//! - TCP socket buffers: owned by the caller

use defmt::{debug, error, info, warn, Debug2Format};
use embedded_tls::{
    Aes128GcmSha256, CryptoProvider, NoVerify, TlsConfig, TlsConnection, TlsContext, TlsVerifier,
};
use static_cell::ConstStaticCell;

use super::error::TlsError;
use super::socket::AsyncTcpSocket;

/// TLS read buffer size: 18 KB
const TLS_READ_BUF_SIZE: usize = 18 * 1024;

/// TLS write buffer size: 16 KB
const TLS_WRITE_BUF_SIZE: usize = 16 * 1024;

static TLS_READ_BUF: ConstStaticCell<[u8; TLS_READ_BUF_SIZE]> =
    ConstStaticCell::new([0; TLS_READ_BUF_SIZE]);
static TLS_WRITE_BUF: ConstStaticCell<[u8; TLS_WRITE_BUF_SIZE]> =
    ConstStaticCell::new([0; TLS_WRITE_BUF_SIZE]);

/// Open TLS session over a connected socket
pub type TlsSession<'a> = TlsConnection<'a, AsyncTcpSocket<'a>, Aes128GcmSha256>;

/// Crypto provider wrapping the hardware RNG
struct SimpleCryptoProvider<'a, RNG> {
    rng: &'a mut RNG,
    verifier: NoVerify,
}

impl<'a, RNG> SimpleCryptoProvider<'a, RNG> {
    fn new(rng: &'a mut RNG) -> Self {
        Self {
            rng,
            verifier: NoVerify,
        }
    }
}

impl<RNG> CryptoProvider for SimpleCryptoProvider<'_, RNG>
where
    RNG: rand_core::CryptoRngCore,
{
    type CipherSuite = Aes128GcmSha256;
    type Signature = &'static [u8];

    fn rng(&mut self) -> impl rand_core::CryptoRngCore {
        &mut *self.rng
    }

    fn verifier(
        &mut self,
    ) -> Result<&mut impl TlsVerifier<Self::CipherSuite>, embedded_tls::TlsError> {
        Ok(&mut self.verifier)
    }
}

/// Run the TLS 1.3 handshake over `socket`
///
/// # Arguments
///
/// * `socket` - Connected TCP socket
/// * `server_name` - Hostname sent as SNI
/// * `rng` - Hardware random number generator (STM32F405 RNG peripheral)
///
/// # Errors
///
/// `TlsError::BuffersInUse` on a second call; `TlsError::HandshakeFailed`
/// if the peer rejects the handshake.
pub async fn open<'a, RNG>(
    socket: AsyncTcpSocket<'a>,
    server_name: &str,
    rng: &mut RNG,
) -> Result<TlsSession<'a>, TlsError>
where
    RNG: rand_core::RngCore + rand_core::CryptoRng,
{
    let (Some(read_buf), Some(write_buf)) = (TLS_READ_BUF.try_take(), TLS_WRITE_BUF.try_take())
    else {
        error!("TLS record buffers already taken");
        return Err(TlsError::BuffersInUse);
    };
    debug!(
        "TLS buffers allocated: read={} bytes, write={} bytes (main SRAM)",
        read_buf.len(),
        write_buf.len()
    );

    let config = TlsConfig::new().with_server_name(server_name);
    warn!("Server certificate is not verified");

    let mut session = TlsSession::new(socket, read_buf, write_buf);

    info!("Initiating TLS 1.3 handshake with {}", server_name);
    let provider = SimpleCryptoProvider::new(rng);
    session
        .open(TlsContext::new(&config, provider))
        .await
        .map_err(|e| {
            error!("TLS handshake failed: {:?}", Debug2Format(&e));
            TlsError::HandshakeFailed
        })?;

    info!("TLS 1.3 session established");
    Ok(session)
}

/// Send close_notify and release the socket
pub async fn close(session: TlsSession<'_>) -> Result<(), TlsError> {
    let mut socket = session.close().await.map_err(|(_socket, e)| {
        warn!("TLS close returned error: {:?}", Debug2Format(&e));
        TlsError::ConnectionClosed
    })?;
    socket.close();
    info!("TLS connection closed cleanly");
    Ok(())
}
