//! Concrete drivers for the sensors fitted to the node
//!
//! A sensor compiled out by its cargo feature is replaced by [`Absent`], so
//! the node type stays the same shape whatever the hardware.

mod pms5003;
#[cfg(feature = "sensor-co2")]
mod scd41;
#[cfg(feature = "sensor-sht")]
mod sht40;

use core::marker::PhantomData;

pub use pms5003::*;
#[cfg(feature = "sensor-co2")]
pub use scd41::*;
#[cfg(feature = "sensor-sht")]
pub use sht40::*;

use airnode_core::sensors::{ClimateReading, PowerControl, Sensor, SensorError};

use crate::async_i2c_bus::BoardI2cDevice;

pub type BoardUart = esp_hal::uart::Uart<'static, esp_hal::Async>;

#[cfg(feature = "sensor-pm")]
pub type ParticulateDriver = Pms5003Sensor<BoardUart>;
#[cfg(not(feature = "sensor-pm"))]
pub type ParticulateDriver = Absent<i32>;

#[cfg(feature = "sensor-co2")]
pub type Co2Driver = Scd41Sensor<BoardI2cDevice>;
#[cfg(not(feature = "sensor-co2"))]
pub type Co2Driver = Absent<i32>;

#[cfg(feature = "sensor-sht")]
pub type ClimateDriver = Sht40Sensor<BoardI2cDevice>;
#[cfg(not(feature = "sensor-sht"))]
pub type ClimateDriver = Absent<ClimateReading>;

/// Placeholder for a sensor that is not fitted
pub struct Absent<R>(PhantomData<R>);

impl<R> Default for Absent<R> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

const ABSENT: SensorError = SensorError::Disabled { sensor: "absent" };

impl Sensor for Absent<i32> {
    const NAME: &'static str = "absent";
    type Reading = i32;

    async fn read(&mut self) -> Result<i32, SensorError> {
        Err(ABSENT)
    }
}

impl Sensor for Absent<ClimateReading> {
    const NAME: &'static str = "absent";
    type Reading = ClimateReading;

    async fn read(&mut self) -> Result<ClimateReading, SensorError> {
        Err(ABSENT)
    }
}

impl PowerControl for Absent<i32> {
    async fn wake(&mut self) -> Result<(), SensorError> {
        Err(ABSENT)
    }

    async fn sleep(&mut self) -> Result<(), SensorError> {
        Err(ABSENT)
    }
}
