#![deny(unsafe_code)]
#![deny(warnings)]
//! Network stack bring-up helpers

use defmt::info;
use embassy_net::Stack;

/// Wait for DHCP and log the lease
pub async fn wait_for_config(stack: &Stack<'_>) {
    info!("Waiting for DHCP...");
    stack.wait_config_up().await;
    info!("Network is UP!");

    if let Some(config) = stack.config_v4() {
        let octets = config.address.address().octets();
        info!(
            "IP: {}.{}.{}.{}/{}",
            octets[0],
            octets[1],
            octets[2],
            octets[3],
            config.address.prefix_len()
        );

        if let Some(gateway) = config.gateway {
            let gw = gateway.octets();
            info!("Gateway: {}.{}.{}.{}", gw[0], gw[1], gw[2], gw[3]);
        }
        for server in config.dns_servers.iter() {
            let dns = server.octets();
            info!("DNS: {}.{}.{}.{}", dns[0], dns[1], dns[2], dns[3]);
        }
    }
}
