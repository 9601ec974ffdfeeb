//! Round-robin status display
//!
//! Every firing shows one metric family and moves the phase on by one:
//! PM2.5, CO2, temperature, humidity, then back to PM2.5. PM2.5 comes from the
//! cache kept by the duty cycle; the other three are read from the sensors on
//! the spot, which may block briefly on the bus.

use core::fmt::Write;

use embedded_hal_async::delay::DelayNs;
use log::{debug, error};

use crate::sensors::{
    ClimateSensor, Co2Sensor, ParticulateSensor, SensorAcquisition, SensorType,
};
use crate::ui::{StatusDisplay, TextSize};

/// Number of phases, one per metric family
pub const PHASE_COUNT: u8 = 4;

/// Shown instead of a PM2.5 value until the first valid sample arrives
const NO_VALUE: &str = "--";

type ValueText = heapless::String<16>;

#[derive(Debug, Clone, Default)]
pub struct DisplayRotation {
    phase: u8,
}

impl DisplayRotation {
    pub const fn new() -> Self {
        Self { phase: 0 }
    }

    /// Phase that the next call to [`Self::advance`] will render
    pub fn phase(&self) -> u8 {
        self.phase
    }

    /// Metric family shown in the given phase
    pub const fn metric_for(phase: u8) -> SensorType {
        SensorType::ALL[(phase % PHASE_COUNT) as usize]
    }

    /// Render the current phase and move on to the next one.
    ///
    /// Phases whose sensor is disabled, or whose read fails, leave the display
    /// untouched. The phase advances regardless. Returns the metric that was
    /// rendered, if any.
    pub async fn advance<P, C, T, D, S>(
        &mut self,
        acquisition: &mut SensorAcquisition<P, C, T, D>,
        display: &mut S,
    ) -> Option<SensorType>
    where
        P: ParticulateSensor,
        C: Co2Sensor,
        T: ClimateSensor,
        D: DelayNs,
        S: StatusDisplay,
    {
        let metric = Self::metric_for(self.phase);
        self.phase = (self.phase + 1) % PHASE_COUNT;

        if !metric.is_enabled(acquisition.capabilities()) {
            debug!("Skipping display phase for disabled {:?}", metric);
            return None;
        }

        let value = Self::sample(metric, acquisition).await?;

        match display.show(metric.label(), &value, TextSize::Large) {
            Ok(()) => Some(metric),
            Err(e) => {
                error!("Failed to draw {:?} on the status display: {:?}", metric, e);
                None
            }
        }
    }

    async fn sample<P, C, T, D>(
        metric: SensorType,
        acquisition: &mut SensorAcquisition<P, C, T, D>,
    ) -> Option<ValueText>
    where
        P: ParticulateSensor,
        C: Co2Sensor,
        T: ClimateSensor,
        D: DelayNs,
    {
        let mut text = ValueText::new();

        let written = match metric {
            SensorType::Pm25 => match acquisition.last_pm25() {
                Some(pm25) => write!(text, "{pm25}"),
                None => text.write_str(NO_VALUE),
            },
            SensorType::Co2 => {
                let ppm = acquisition.read_co2().await.ok()?;
                write!(text, "{ppm}")
            }
            SensorType::Temperature => {
                let reading = acquisition.read_climate().await.ok()?;
                write!(text, "{:.1}C", reading.temperature_c)
            }
            SensorType::Humidity => {
                let reading = acquisition.read_climate().await.ok()?;
                write!(text, "{:.2}%", reading.humidity_pct)
            }
        };

        written.ok()?;
        Some(text)
    }
}
