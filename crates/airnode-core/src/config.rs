//! Node configuration: capability flags, timing, and device identity

use core::fmt::{self, Write};
use core::net::Ipv4Addr;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Maximum length of the device id embedded in every exported label set
pub const DEVICE_ID_CAPACITY: usize = 32;

/// Port the metrics endpoint listens on
pub const DEFAULT_PORT: u16 = 9925;

/// Delay between CO2 read attempts when the sensor returns garbage
pub const DEFAULT_CO2_RETRY_DELAY_MS: u32 = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("device id is longer than 32 bytes")]
    DeviceIdTooLong,
    #[error("invalid MAC address: expected six colon-separated hex octets")]
    InvalidMacAddress,
    #[error("invalid static IPv4 setting: {0}")]
    InvalidIpv4(&'static str),
}

/// Which sensors are fitted to this node.
///
/// Each flag gates both sampling and export for its sensor. The defaults come
/// from the `sensor-pm`, `sensor-co2` and `sensor-sht` cargo features.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub particulate: bool,
    pub co2: bool,
    pub climate: bool,
}

impl Capabilities {
    /// Capabilities as selected by the enabled cargo features
    pub const fn from_features() -> Self {
        Self {
            particulate: cfg!(feature = "sensor-pm"),
            co2: cfg!(feature = "sensor-co2"),
            climate: cfg!(feature = "sensor-sht"),
        }
    }

    pub const fn all() -> Self {
        Self {
            particulate: true,
            co2: true,
            climate: true,
        }
    }

    pub const fn without_co2(self) -> Self {
        Self { co2: false, ..self }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::from_features()
    }
}

/// Scheduling cadence of the display and the particulate duty cycle
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Timing {
    /// How long each metric stays on the status display
    pub display_rotation_ms: u64,
    /// How long the particulate sensor stays awake after each wake trigger
    pub pm_on_for_ms: u64,
    /// Full wake-to-wake period of the particulate sensor
    pub pm_period_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            display_rotation_ms: 5_000,
            pm_on_for_ms: 30_000,
            pm_period_ms: 120_000,
        }
    }
}

/// Upper bound on CO2 read attempts.
///
/// `Unbounded` keeps retrying until the sensor produces a valid value, which
/// can stall the whole loop if the bus never recovers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    #[default]
    Unbounded,
    /// Give up after this many attempts in total
    Bounded(u32),
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempts` have been made
    pub const fn allows_another(self, attempts: u32) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Bounded(max) => attempts < max,
        }
    }
}

/// Network hardware address, rendered as `AA:BB:CC:DD:EE:FF`
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Short board id shown on the boot screen: the low three octets in hex
    pub fn chip_id(&self) -> heapless::String<6> {
        let mut id = heapless::String::new();
        let [.., d, e, g] = self.0;
        // Six hex digits always fit
        let _ = write!(id, "{d:02x}{e:02x}{g:02x}");
        id
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for MacAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');

        for octet in octets.iter_mut() {
            let part = parts.next().ok_or(ConfigError::InvalidMacAddress)?;
            if part.len() != 2 {
                return Err(ConfigError::InvalidMacAddress);
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| ConfigError::InvalidMacAddress)?;
        }

        if parts.next().is_some() {
            return Err(ConfigError::InvalidMacAddress);
        }

        Ok(Self(octets))
    }
}

/// Identity embedded in every exported metric's label set
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceIdentity {
    pub id: heapless::String<DEVICE_ID_CAPACITY>,
    pub mac: MacAddress,
}

impl DeviceIdentity {
    pub fn new(id: &str, mac: MacAddress) -> Result<Self, ConfigError> {
        let id = heapless::String::from_str(id).map_err(|_| ConfigError::DeviceIdTooLong)?;
        Ok(Self { id, mac })
    }
}

/// Fixed IPv4 setup used instead of DHCP
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticIpv4 {
    pub address: [u8; 4],
    pub gateway: [u8; 4],
    pub prefix_len: u8,
}

impl StaticIpv4 {
    /// Parse dotted-quad settings. An empty `address` means DHCP and yields
    /// `None`; the subnet mask must be contiguous.
    pub fn parse(address: &str, gateway: &str, subnet: &str) -> Result<Option<Self>, ConfigError> {
        if address.is_empty() {
            return Ok(None);
        }

        let parse = |field: &'static str, value: &str| {
            Ipv4Addr::from_str(value).map_err(|_| ConfigError::InvalidIpv4(field))
        };
        let address = parse("address", address)?;
        let gateway = parse("gateway", gateway)?;
        let mask = parse("subnet", subnet)?.to_bits();

        if mask.leading_ones() != mask.count_ones() {
            return Err(ConfigError::InvalidIpv4("subnet"));
        }

        Ok(Some(Self {
            address: address.octets(),
            gateway: gateway.octets(),
            prefix_len: mask.count_ones() as u8,
        }))
    }

    pub fn address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.address)
    }

    pub fn gateway(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.gateway)
    }
}

/// Complete runtime configuration of a node
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct NodeConfig {
    pub identity: DeviceIdentity,
    pub capabilities: Capabilities,
    pub timing: Timing,
    pub co2_retry: RetryPolicy,
    pub co2_retry_delay_ms: u32,
    pub port: u16,
    /// `None` leases an address over DHCP
    pub static_ip: Option<StaticIpv4>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            identity: DeviceIdentity::default(),
            capabilities: Capabilities::default(),
            timing: Timing::default(),
            co2_retry: RetryPolicy::default(),
            co2_retry_delay_ms: DEFAULT_CO2_RETRY_DELAY_MS,
            port: DEFAULT_PORT,
            static_ip: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_mac_address_display() {
        let mac = MacAddress([0x5c, 0xcf, 0x7f, 0x01, 0xab, 0x0e]);
        assert_eq!(mac.to_string(), "5C:CF:7F:01:AB:0E");
    }

    #[test]
    fn test_mac_address_parse() {
        let mac: MacAddress = "5c:cf:7f:01:ab:0e".parse().unwrap();
        assert_eq!(mac.0, [0x5c, 0xcf, 0x7f, 0x01, 0xab, 0x0e]);

        assert!("5c:cf:7f:01:ab".parse::<MacAddress>().is_err());
        assert!("5c:cf:7f:01:ab:0e:11".parse::<MacAddress>().is_err());
        assert!("5c:cf:7f:01:ab:zz".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_chip_id() {
        let mac = MacAddress([0x5c, 0xcf, 0x7f, 0x01, 0xab, 0x0e]);
        assert_eq!(mac.chip_id(), "01ab0e");
    }

    #[test]
    fn test_device_id_capacity() {
        assert!(DeviceIdentity::new("kitchen", MacAddress::default()).is_ok());

        let too_long = "x".repeat(DEVICE_ID_CAPACITY + 1);
        assert_eq!(
            DeviceIdentity::new(&too_long, MacAddress::default()),
            Err(ConfigError::DeviceIdTooLong)
        );
    }

    #[test]
    fn test_static_ipv4() {
        assert_eq!(StaticIpv4::parse("", "", ""), Ok(None));

        let ip = StaticIpv4::parse("192.168.1.40", "192.168.1.1", "255.255.255.0")
            .unwrap()
            .unwrap();
        assert_eq!(ip.address(), Ipv4Addr::new(192, 168, 1, 40));
        assert_eq!(ip.gateway(), Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(ip.prefix_len, 24);
    }

    #[test]
    fn test_static_ipv4_rejects_bad_settings() {
        assert_eq!(
            StaticIpv4::parse("192.168.1", "192.168.1.1", "255.255.255.0"),
            Err(ConfigError::InvalidIpv4("address"))
        );
        assert_eq!(
            StaticIpv4::parse("192.168.1.40", "", "255.255.255.0"),
            Err(ConfigError::InvalidIpv4("gateway"))
        );
        assert_eq!(
            StaticIpv4::parse("192.168.1.40", "192.168.1.1", "255.0.255.0"),
            Err(ConfigError::InvalidIpv4("subnet"))
        );
    }

    #[test]
    fn test_retry_policy() {
        assert!(RetryPolicy::Unbounded.allows_another(u32::MAX));
        assert!(RetryPolicy::Bounded(3).allows_another(2));
        assert!(!RetryPolicy::Bounded(3).allows_another(3));
    }

    #[test]
    fn test_default_timing() {
        let timing = Timing::default();
        assert_eq!(timing.display_rotation_ms, 5_000);
        assert_eq!(timing.pm_on_for_ms, 30_000);
        assert_eq!(timing.pm_period_ms, 120_000);
    }
}
