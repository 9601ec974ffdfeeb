//! ESP32-S3 firmware-specific modules for airnode
//!
//! This crate contains the hardware-specific code that cannot compile on
//! desktop targets: peripheral bring-up, the concrete sensor drivers, WiFi
//! and the picoserve front end of the metrics endpoint.

#![no_std]

extern crate alloc;

pub mod app_state;
pub mod async_i2c_bus;
pub mod net;
pub mod sensors;
pub mod wifi_secrets;
