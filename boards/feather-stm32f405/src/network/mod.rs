#![deny(warnings)]
//! Network module
//!
//! - **`config`**: Configuration structs with `Default` implementations
//! - **`error`**: Error enums for network operations
//! - **`manager`**: DHCP wait and lease logging
//! - **`sntp`**: SNTP time synchronization
//! - **`socket`**: DNS plus an async TCP socket for embedded-io-async
//! - **`tls`**: TLS 1.3 session over that socket
//!
//! The W5500 handles its own buffering, so `embassy-net-wiznet` is used
//! directly and the `embassy-net` stack does all TCP/IP processing.

pub mod config;
pub mod error;
pub mod manager;
pub mod sntp;
pub mod socket;
pub mod tls;

// Re-export commonly used types
pub use config::NetworkConfig;
pub use error::NetworkError;
pub use sntp::SntpClient;
