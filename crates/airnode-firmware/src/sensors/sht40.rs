use airnode_core::sensors::{ClimateReading, Sensor, SensorError};
use embedded_hal_async::i2c::I2c;
use log::error;
use sht4x::Sht4xAsync;

const NAME: &str = "SHT40";

pub struct Sht40Sensor<I> {
    sensor: Sht4xAsync<I, embassy_time::Delay>,
}

impl<I: I2c> Sht40Sensor<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            sensor: Sht4xAsync::<I, embassy_time::Delay>::new(i2c),
        }
    }
}

impl<I: I2c> Sensor for Sht40Sensor<I> {
    const NAME: &'static str = NAME;
    type Reading = ClimateReading;

    async fn read(&mut self) -> Result<ClimateReading, SensorError> {
        let measurement = self
            .sensor
            .measure(sht4x::Precision::High, &mut embassy_time::Delay)
            .await
            .map_err(|e| {
                error!("SHT40 measurement failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: NAME,
                    operation: "measure temperature/humidity",
                    details: "I2C communication error or sensor not responding",
                }
            })?;

        Ok(ClimateReading {
            temperature_c: measurement.temperature_celsius().to_num::<f32>(),
            humidity_pct: measurement.humidity_percent().to_num::<f32>(),
        })
    }
}
