use airnode_core::sensors::{Sensor, SensorError};
use embedded_hal_async::i2c::I2c;
use log::{error, info};
use scd41_embedded::r#async::Scd41Async;

const NAME: &str = "SCD41";

/// Periodic measurement mode produces a new sample every five seconds
const MEASUREMENT_INTERVAL_MS: u64 = 5000;

const fn read_failed(operation: &'static str) -> SensorError {
    SensorError::ReadFailed {
        sensor: NAME,
        operation,
        details: "I2C communication error or sensor not responding",
    }
}

pub struct Scd41Sensor<I> {
    sensor: Scd41Async<I, embassy_time::Delay>,
    measuring: bool,
}

impl<I: I2c> Scd41Sensor<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            sensor: Scd41Async::<I, embassy_time::Delay>::new(i2c, embassy_time::Delay),
            measuring: false,
        }
    }

    /// Enable self-calibration and start periodic measurement
    async fn start_measuring(&mut self) -> Result<(), SensorError> {
        // Fails if no measurement was running, which is fine
        let _ = self.sensor.stop_periodic_measurement().await;

        self.sensor
            .set_automatic_self_calibration(true)
            .await
            .map_err(|_| read_failed("enable self-calibration"))?;

        self.sensor
            .start_periodic_measurement()
            .await
            .map_err(|_| read_failed("start periodic measurement"))?;

        self.measuring = true;
        info!("SCD41: periodic measurement started");

        embassy_time::Timer::after_millis(MEASUREMENT_INTERVAL_MS).await;
        Ok(())
    }
}

impl<I: I2c> Sensor for Scd41Sensor<I> {
    const NAME: &'static str = NAME;
    type Reading = i32;

    /// A sample that is not ready yet is reported as `0`, which the
    /// acquisition layer rejects and retries.
    async fn read(&mut self) -> Result<i32, SensorError> {
        if !self.measuring {
            self.start_measuring().await.inspect_err(|e| {
                error!("SCD41 initialization failed: {}", e);
            })?;
        }

        let ready = self
            .sensor
            .data_ready()
            .await
            .map_err(|_| read_failed("poll data ready"))?;
        if !ready {
            return Ok(0);
        }

        let measurement = self
            .sensor
            .measurement()
            .await
            .map_err(|_| read_failed("read measurement"))?;

        Ok(measurement.co2_ppm as i32)
    }
}
