//! Bakes WiFi credentials and the device id into the firmware.
//!
//! Values come from the environment, with a `.env` file in the crate or any
//! parent directory loaded first. `WIFI_SSID` and `WIFI_PASSWORD` are
//! required; `AIRNODE_DEVICE_ID`, `AIRNODE_PORT` and the static IPv4
//! settings are optional. Leaving `AIRNODE_STATIC_IP` empty selects DHCP.

const REQUIRED: [&str; 2] = ["WIFI_SSID", "WIFI_PASSWORD"];
const OPTIONAL: [(&str, &str); 5] = [
    ("AIRNODE_DEVICE_ID", ""),
    ("AIRNODE_PORT", "9925"),
    ("AIRNODE_STATIC_IP", ""),
    ("AIRNODE_GATEWAY", ""),
    ("AIRNODE_SUBNET", "255.255.255.0"),
];

fn main() {
    println!("cargo:rustc-link-arg=-Tlinkall.x");

    if let Ok(path) = dotenvy::dotenv() {
        println!("cargo:rerun-if-changed={}", path.display());
    }

    for key in REQUIRED {
        println!("cargo:rerun-if-env-changed={key}");
        let value = std::env::var(key).unwrap_or_else(|_| {
            panic!("{key} must be set in the environment or in a .env file");
        });
        println!("cargo:rustc-env={key}={value}");
    }

    for (key, default) in OPTIONAL {
        println!("cargo:rerun-if-env-changed={key}");
        let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
        println!("cargo:rustc-env={key}={value}");
    }
}
