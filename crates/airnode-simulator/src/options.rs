//! Command line options and the node configuration they produce
//!
//! A JSON file (`--config`) gives the base configuration; every option given
//! on the command line or through its environment variable overrides the
//! matching field.

use std::fs::File;
use std::io::BufReader;
use std::net::IpAddr;
use std::path::PathBuf;

use airnode_core::config::{DeviceIdentity, MacAddress, NodeConfig, RetryPolicy};
use color_eyre::eyre::{Result, WrapErr, eyre};
use structopt::StructOpt;

/// Locally administered address used when nothing else is configured
const DEFAULT_MAC: MacAddress = MacAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);

#[derive(Debug, Clone, StructOpt)]
#[structopt(name = "airnode-simulator")]
pub struct Options {
    /// JSON node configuration file
    #[structopt(long, short, parse(from_os_str), env = "AIRNODE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address the metrics endpoint binds to
    #[structopt(long, default_value = "127.0.0.1", env = "AIRNODE_BIND")]
    pub bind: IpAddr,

    /// Metrics endpoint port [default: 9925]
    #[structopt(long, short, env = "AIRNODE_PORT")]
    pub port: Option<u16>,

    /// Device id exported in every label set
    #[structopt(long, env = "AIRNODE_DEVICE_ID")]
    pub device_id: Option<String>,

    /// MAC address exported in every label set, e.g. 02:00:00:00:00:01
    #[structopt(long, env = "AIRNODE_MAC")]
    pub mac: Option<MacAddress>,

    /// Run without the particulate sensor
    #[structopt(long)]
    pub no_pm: bool,

    /// Run without the CO2 sensor
    #[structopt(long)]
    pub no_co2: bool,

    /// Run without the temperature/humidity sensor
    #[structopt(long)]
    pub no_climate: bool,

    /// Give up on a CO2 read after this many attempts instead of retrying
    /// until a valid value arrives
    #[structopt(long)]
    pub co2_max_attempts: Option<u32>,

    /// Simulated milliseconds the particulate sensor reports 0 after waking
    #[structopt(long, default_value = "10000")]
    pub pm_warm_up_ms: u64,

    /// Simulated time runs this many times faster than wall-clock time
    #[structopt(long, default_value = "1")]
    pub speed: u32,

    /// Exit after this many wall-clock seconds
    #[structopt(long)]
    pub run_for_secs: Option<u64>,

    /// Save the final display contents as a PNG
    #[structopt(long, parse(from_os_str))]
    pub snapshot: Option<PathBuf>,
}

impl Options {
    /// Load the configuration file, if any, and apply overrides on top
    pub fn node_config(&self) -> Result<NodeConfig> {
        let base = match &self.config {
            Some(path) => {
                let file = File::open(path)
                    .wrap_err_with(|| format!("could not open {}", path.display()))?;
                serde_json::from_reader(BufReader::new(file))
                    .wrap_err_with(|| format!("invalid node configuration in {}", path.display()))?
            }
            None => NodeConfig {
                identity: DeviceIdentity {
                    mac: DEFAULT_MAC,
                    ..DeviceIdentity::default()
                },
                ..NodeConfig::default()
            },
        };

        self.apply(base)
    }

    fn apply(&self, mut config: NodeConfig) -> Result<NodeConfig> {
        if let Some(port) = self.port {
            config.port = port;
        }

        if let Some(mac) = self.mac {
            config.identity.mac = mac;
        }

        if let Some(id) = &self.device_id {
            config.identity =
                DeviceIdentity::new(id, config.identity.mac).map_err(|e| eyre!("{}", e))?;
        }

        config.capabilities.particulate &= !self.no_pm;
        config.capabilities.co2 &= !self.no_co2;
        config.capabilities.climate &= !self.no_climate;

        if let Some(attempts) = self.co2_max_attempts {
            if attempts == 0 {
                return Err(eyre!("--co2-max-attempts must be at least 1"));
            }
            config.co2_retry = RetryPolicy::Bounded(attempts);
        }

        if self.speed == 0 {
            return Err(eyre!("--speed must be at least 1"));
        }

        Ok(config)
    }
}
