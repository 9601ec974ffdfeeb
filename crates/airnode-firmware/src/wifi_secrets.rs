//! Build-time settings injected by `build.rs` from the environment or `.env`

pub const WIFI_SSID: &str = env!("WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");

/// Empty when not configured; metrics then carry `id=""`
pub const DEVICE_ID: &str = env!("AIRNODE_DEVICE_ID");

pub const PORT: &str = env!("AIRNODE_PORT");

/// Empty to lease an address over DHCP
pub const STATIC_IP: &str = env!("AIRNODE_STATIC_IP");
pub const GATEWAY: &str = env!("AIRNODE_GATEWAY");
pub const SUBNET: &str = env!("AIRNODE_SUBNET");
