//! Hardware-independent core library for airnode
//!
//! This crate contains all platform-agnostic logic for the airnode sensor
//! node: the cooperative task scheduler, the particulate sensor duty cycle,
//! the status display rotation, sensor acquisition with validity filtering,
//! and the text metrics exposition served to pull-based collectors.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod config;
pub mod display_rotation;
pub mod http;
pub mod metrics;
pub mod node;
pub mod power_cycle;
pub mod scheduler;
pub mod sensors;
pub mod ui;
