#![deny(unsafe_code)]
#![deny(warnings)]
//! Network and relay configuration structures
//!
//! Device credentials and the endpoint are baked in at build time:
//!
//! ```text
//! RELAY_DEVICE_ID=... RELAY_DEVICE_TOKEN=... \
//! RELAY_ENDPOINT=wss://api.artik.cloud/v1.1/websocket?ack=true \
//!     cargo build -p relay-feather-stm32f405 --release
//! ```

use relay_core::config::{ConfigError, DEFAULT_ENDPOINT_URL};
use relay_core::{DeviceIdentity, Endpoint, RelayConfig};

/// SNTP client configuration
#[derive(Debug, Clone)]
pub struct SntpConfig {
    /// NTP servers to try (in order)
    pub servers: &'static [&'static str],
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Number of retry attempts per server
    pub retry_count: usize,
    /// Maximum accepted stratum level (1-15)
    pub max_stratum: u8,
}

impl Default for SntpConfig {
    fn default() -> Self {
        Self {
            servers: &["pool.ntp.org", "time.google.com", "time.cloudflare.com"],
            timeout_ms: 5000,
            retry_count: 3,
            max_stratum: 3,
        }
    }
}

/// Network stack configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// MAC address for Ethernet
    pub mac_addr: [u8; 6],
    /// Random seed for network stack
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mac_addr: [0x02, 0x00, 0x00, 0x12, 0x34, 0x56],
            seed: 0x1234_5678_u64,
        }
    }
}

/// Source device id used when `RELAY_DEVICE_ID` is unset
const PLACEHOLDER_DEVICE_ID: &str = "00000000000000000000000000000000";

/// Bearer token used when `RELAY_DEVICE_TOKEN` is unset
const PLACEHOLDER_DEVICE_TOKEN: &str = "00000000000000000000000000000000";

/// Relay configuration from build-time environment
///
/// Falls back to the default endpoint and placeholder credentials, which
/// the cloud will refuse at registration.
pub fn relay_config() -> Result<RelayConfig, ConfigError> {
    let sdid = option_env!("RELAY_DEVICE_ID").unwrap_or(PLACEHOLDER_DEVICE_ID);
    let token = option_env!("RELAY_DEVICE_TOKEN").unwrap_or(PLACEHOLDER_DEVICE_TOKEN);
    let url = option_env!("RELAY_ENDPOINT").unwrap_or(DEFAULT_ENDPOINT_URL);

    if option_env!("RELAY_DEVICE_ID").is_none() || option_env!("RELAY_DEVICE_TOKEN").is_none() {
        defmt::warn!("RELAY_DEVICE_ID/RELAY_DEVICE_TOKEN not set at build time; using placeholders");
    }

    let identity = DeviceIdentity::new(sdid, token)?;
    let endpoint = Endpoint::parse(url)?;
    Ok(RelayConfig::new(identity).with_endpoint(endpoint))
}
