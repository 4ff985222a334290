//! Relay configuration
//!
//! Everything the relay needs is injected here at construction time: the
//! endpoint to dial, the device identity presented at registration, and the
//! sensor bus address. Nothing is read from globals.

use core::fmt;

use heapless::String;

/// Maximum length of a source device identifier (sdid)
pub const MAX_SDID_LEN: usize = 64;

/// Maximum length of a device bearer token
pub const MAX_TOKEN_LEN: usize = 64;

/// Default cloud WebSocket endpoint
pub const DEFAULT_ENDPOINT_URL: &str = "wss://api.artik.cloud/v1.1/websocket?ack=true";

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// URL scheme is neither `ws` nor `wss`
    UnsupportedScheme,
    /// URL has no host
    MissingHost,
    /// Port is not a number in 1..=65535
    InvalidPort,
    /// Device identifier is empty, too long or has control characters
    InvalidDeviceId,
    /// Token is empty, too long or has control characters
    InvalidToken,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedScheme => write!(f, "Unsupported URL scheme"),
            Self::MissingHost => write!(f, "Missing host"),
            Self::InvalidPort => write!(f, "Invalid port"),
            Self::InvalidDeviceId => write!(f, "Invalid device identifier"),
            Self::InvalidToken => write!(f, "Invalid device token"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// WebSocket endpoint split into the parts the dialer needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Endpoint {
    /// `wss` (TLS) or `ws` (plain TCP)
    pub secure: bool,
    /// Hostname for DNS, SNI and the `Host` header
    pub host: &'static str,
    /// TCP port
    pub port: u16,
    /// Request target including any query string
    pub path: &'static str,
}

impl Endpoint {
    /// `wss://api.artik.cloud/v1.1/websocket?ack=true`
    pub const DEFAULT: Endpoint = Endpoint {
        secure: true,
        host: "api.artik.cloud",
        port: 443,
        path: "/v1.1/websocket?ack=true",
    };

    /// Parse a `ws://` or `wss://` URL
    ///
    /// The port defaults to 443 for `wss` and 80 for `ws`. An empty path
    /// becomes `/`. IPv6 literals are not supported.
    pub fn parse(url: &'static str) -> Result<Self, ConfigError> {
        let (secure, rest) = if let Some(rest) = url.strip_prefix("wss://") {
            (true, rest)
        } else if let Some(rest) = url.strip_prefix("ws://") {
            (false, rest)
        } else {
            return Err(ConfigError::UnsupportedScheme);
        };

        let split = rest.find(|c: char| c == '/' || c == '?').unwrap_or(rest.len());
        let (authority, path) = rest.split_at(split);
        let path = if path.is_empty() { "/" } else { path };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port: u16 = port.parse().map_err(|_| ConfigError::InvalidPort)?;
                if port == 0 {
                    return Err(ConfigError::InvalidPort);
                }
                (host, port)
            }
            None => (authority, if secure { 443 } else { 80 }),
        };

        if host.is_empty() || host.contains(|c: char| matches!(c, '[' | ']' | '@')) {
            return Err(ConfigError::MissingHost);
        }

        Ok(Self {
            secure,
            host,
            port,
            path,
        })
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Device identity presented in the registration message
///
/// The token is a credential: `Debug` redacts it and nothing in this crate
/// logs it.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    sdid: String<MAX_SDID_LEN>,
    token: String<MAX_TOKEN_LEN>,
}

impl DeviceIdentity {
    /// Validate and copy a device id and bearer token
    ///
    /// Control characters are refused so every byte escapes to at most two
    /// in the JSON messages.
    pub fn new(sdid: &str, token: &str) -> Result<Self, ConfigError> {
        if sdid.is_empty() || sdid.contains(char::is_control) {
            return Err(ConfigError::InvalidDeviceId);
        }
        if token.is_empty() || token.contains(char::is_control) {
            return Err(ConfigError::InvalidToken);
        }
        Ok(Self {
            sdid: String::try_from(sdid).map_err(|_| ConfigError::InvalidDeviceId)?,
            token: String::try_from(token).map_err(|_| ConfigError::InvalidToken)?,
        })
    }

    /// Source device identifier
    pub fn sdid(&self) -> &str {
        &self.sdid
    }

    /// Bearer token
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("sdid", &self.sdid.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Sensor bus configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorConfig {
    /// 7-bit I2C address of the sensor's EZI2C buffer
    pub i2c_address: u8,
    /// Buffer sub-address the frame starts at
    pub offset: u8,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            i2c_address: 0x18,
            offset: 0x00,
        }
    }
}

/// Complete relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Cloud endpoint
    pub endpoint: Endpoint,
    /// Identity used for registration and data envelopes
    pub identity: DeviceIdentity,
    /// Sensor bus settings
    pub sensor: SensorConfig,
}

impl RelayConfig {
    /// Configuration for the default endpoint and sensor address
    pub fn new(identity: DeviceIdentity) -> Self {
        Self {
            endpoint: Endpoint::default(),
            identity,
            sensor: SensorConfig::default(),
        }
    }

    /// Override the endpoint
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_matches_url() {
        assert_eq!(Endpoint::parse(DEFAULT_ENDPOINT_URL), Ok(Endpoint::DEFAULT));
        assert_eq!(Endpoint::default().port, 443);
    }

    #[test]
    fn test_parse_explicit_port_and_plain_scheme() {
        let ep = Endpoint::parse("ws://192.168.1.1:8080/socket").unwrap();
        assert!(!ep.secure);
        assert_eq!(ep.host, "192.168.1.1");
        assert_eq!(ep.port, 8080);
        assert_eq!(ep.path, "/socket");

        let ep = Endpoint::parse("ws://example.com").unwrap();
        assert_eq!(ep.port, 80);
        assert_eq!(ep.path, "/");

        let ep = Endpoint::parse("wss://example.com?ack=true").unwrap();
        assert_eq!(ep.host, "example.com");
        assert_eq!(ep.path, "?ack=true");
    }

    #[test]
    fn test_parse_rejects_bad_urls() {
        assert_eq!(
            Endpoint::parse("https://example.com/"),
            Err(ConfigError::UnsupportedScheme)
        );
        assert_eq!(Endpoint::parse("wss:///path"), Err(ConfigError::MissingHost));
        assert_eq!(
            Endpoint::parse("wss://example.com:0/"),
            Err(ConfigError::InvalidPort)
        );
        assert_eq!(
            Endpoint::parse("wss://example.com:http/"),
            Err(ConfigError::InvalidPort)
        );
        assert_eq!(Endpoint::parse("wss://[::1]:443/"), Err(ConfigError::MissingHost));
    }

    #[test]
    fn test_identity_validation() {
        assert_eq!(
            DeviceIdentity::new("", "token").unwrap_err(),
            ConfigError::InvalidDeviceId
        );
        assert_eq!(
            DeviceIdentity::new("dev", "").unwrap_err(),
            ConfigError::InvalidToken
        );
        let long = "x".repeat(MAX_TOKEN_LEN + 1);
        assert_eq!(
            DeviceIdentity::new("dev", &long).unwrap_err(),
            ConfigError::InvalidToken
        );

        let ctrl = "\u{1}".repeat(MAX_SDID_LEN);
        assert_eq!(
            DeviceIdentity::new(&ctrl, "token").unwrap_err(),
            ConfigError::InvalidDeviceId
        );
        assert_eq!(
            DeviceIdentity::new("dev", "tok\nen").unwrap_err(),
            ConfigError::InvalidToken
        );

        let id = DeviceIdentity::new("dev-1", "secret").unwrap();
        assert_eq!(id.sdid(), "dev-1");
        assert_eq!(id.token(), "secret");
    }

    #[test]
    fn test_identity_debug_redacts_token() {
        let id = DeviceIdentity::new("dev-1", "s3cr3t-token").unwrap();
        let rendered = format!("{:?}", id);
        assert!(rendered.contains("dev-1"));
        assert!(!rendered.contains("s3cr3t-token"));
    }

    #[test]
    fn test_default_sensor_address() {
        let config = RelayConfig::new(DeviceIdentity::new("dev", "tok").unwrap());
        assert_eq!(config.sensor.i2c_address, 0x18);
        assert_eq!(config.endpoint, Endpoint::DEFAULT);
    }
}
