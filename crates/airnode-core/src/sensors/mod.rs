//! Sensor driver traits, reading types and errors

mod acquisition;
pub mod pms5003;

#[cfg(test)]
pub(crate) mod testing;

pub use acquisition::*;

use thiserror_no_std::Error;

use crate::config::Capabilities;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} read failed during {operation}: {details}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor} rejected power command {command}: {details}")]
    PowerCommandFailed {
        sensor: &'static str,
        command: &'static str,
        details: &'static str,
    },
    #[error("{sensor} is not enabled on this node")]
    Disabled { sensor: &'static str },
    #[error("{sensor} gave no valid reading after {attempts} attempts")]
    RetriesExhausted { sensor: &'static str, attempts: u32 },
    #[error("invalid {sensor} frame: {details}")]
    InvalidFrame {
        sensor: &'static str,
        details: &'static str,
    },
}

/// Trait for sensors that produce typed readings.
pub trait Sensor {
    /// Short name used in logs and errors
    const NAME: &'static str;

    /// The type of readings this sensor produces.
    type Reading;

    /// Read the sensor once and return the raw, unfiltered reading.
    fn read(&mut self) -> impl Future<Output = Result<Self::Reading, SensorError>>;
}

/// Sensors that can be put to sleep between samples to extend their life.
pub trait PowerControl {
    fn wake(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    fn sleep(&mut self) -> impl Future<Output = Result<(), SensorError>>;
}

/// Particulate sensor: raw PM2.5 in µg/m³ plus a wake/sleep duty cycle
pub trait ParticulateSensor: Sensor<Reading = i32> + PowerControl {}

impl<S> ParticulateSensor for S where S: Sensor<Reading = i32> + PowerControl {}

/// CO2 sensor returning raw ppm; values outside the valid range are possible
pub trait Co2Sensor: Sensor<Reading = i32> {}

impl<S> Co2Sensor for S where S: Sensor<Reading = i32> {}

/// Combined temperature/humidity sensor
pub trait ClimateSensor: Sensor<Reading = ClimateReading> {}

impl<S> ClimateSensor for S where S: Sensor<Reading = ClimateReading> {}

/// One combined temperature/humidity measurement
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// Latest known value of every metric this node exports.
///
/// A field stays `None` until its sensor produced a valid reading, and is
/// never populated for a sensor whose capability is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReadings {
    pub pm25: Option<i32>,
    pub co2: Option<i32>,
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
}

/// The metric families shown on the display and exported, in rotation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorType {
    Pm25,
    Co2,
    Temperature,
    Humidity,
}

impl SensorType {
    pub const ALL: [Self; 4] = [Self::Pm25, Self::Co2, Self::Temperature, Self::Humidity];

    /// Short label for the status display
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pm25 => "PM2",
            Self::Co2 => "CO2",
            Self::Temperature => "TMP",
            Self::Humidity => "HUM",
        }
    }

    /// Whether the sensor backing this metric is fitted
    pub const fn is_enabled(self, capabilities: Capabilities) -> bool {
        match self {
            Self::Pm25 => capabilities.particulate,
            Self::Co2 => capabilities.co2,
            Self::Temperature | Self::Humidity => capabilities.climate,
        }
    }
}
