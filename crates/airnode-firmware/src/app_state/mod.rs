//! Firmware-level node assembly and bring-up errors

mod hardware;

pub use hardware::*;

use core::fmt::{Debug, Write};

use airnode_core::config::{DEFAULT_PORT, DeviceIdentity, MacAddress, NodeConfig, StaticIpv4};
use airnode_core::node::AirNode;
use airnode_core::ui::TextPanel;
use log::{error, warn};
use thiserror_no_std::Error;

use crate::sensors::{ClimateDriver, Co2Driver, ParticulateDriver};
use crate::wifi_secrets;

/// The status panel as drawn on the board's LCD
pub type BoardPanel = TextPanel<BoardDisplay>;

/// The node with every concrete driver plugged in
pub type FirmwareNode =
    AirNode<ParticulateDriver, Co2Driver, ClimateDriver, embassy_time::Delay, BoardPanel>;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Board power setup failed: {0}")]
    Power(heapless::String<64>),
    #[error("Display setup failed: {0}")]
    Display(heapless::String<64>),
    #[error("Peripheral configuration failed: {0}")]
    Peripheral(heapless::String<64>),
}

/// Debug-format a driver error into a bounded message, truncating if needed
pub fn describe(error: impl Debug) -> heapless::String<64> {
    let mut message = heapless::String::new();
    let _ = write!(message, "{:?}", error);
    message
}

/// Node configuration from the build-time settings and the board's MAC
pub fn node_config(mac: [u8; 6]) -> NodeConfig {
    let mac = MacAddress(mac);

    let identity = DeviceIdentity::new(wifi_secrets::DEVICE_ID, mac).unwrap_or_else(|e| {
        error!("Ignoring configured device id: {}", e);
        DeviceIdentity {
            mac,
            ..DeviceIdentity::default()
        }
    });

    let port = wifi_secrets::PORT.parse().unwrap_or_else(|_| {
        warn!(
            "Invalid port {:?}, falling back to {}",
            wifi_secrets::PORT,
            DEFAULT_PORT
        );
        DEFAULT_PORT
    });

    let static_ip = StaticIpv4::parse(
        wifi_secrets::STATIC_IP,
        wifi_secrets::GATEWAY,
        wifi_secrets::SUBNET,
    )
    .unwrap_or_else(|e| {
        error!("Ignoring static IP settings, using DHCP: {}", e);
        None
    });

    NodeConfig {
        identity,
        port,
        static_ip,
        ..NodeConfig::default()
    }
}

/// Network stack configuration: the static address when one is set,
/// otherwise DHCP announcing the device id as hostname
pub fn network_config(config: &NodeConfig) -> embassy_net::Config {
    if let Some(ip) = config.static_ip {
        return embassy_net::Config::ipv4_static(embassy_net::StaticConfigV4 {
            address: embassy_net::Ipv4Cidr::new(ip.address(), ip.prefix_len),
            gateway: Some(ip.gateway()),
            dns_servers: Default::default(),
        });
    }

    let mut dhcp = embassy_net::DhcpConfig::default();
    let id = config.identity.id.as_str();
    if !id.is_empty() {
        dhcp.hostname = id.try_into().ok();
        if dhcp.hostname.is_none() {
            warn!("Device id {:?} cannot be used as DHCP hostname", id);
        }
    }
    embassy_net::Config::dhcpv4(dhcp)
}
