use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};

use super::{
    ClimateReading, ClimateSensor, Co2Sensor, ParticulateSensor, SensorError, SensorReadings,
};
use crate::config::{Capabilities, NodeConfig, RetryPolicy, DEFAULT_CO2_RETRY_DELAY_MS};

/// Smallest CO2 value accepted from the sensor, exclusive
pub const CO2_MIN_EXCLUSIVE_PPM: i32 = 0;

/// Largest CO2 value accepted from the sensor, exclusive
pub const CO2_MAX_EXCLUSIVE_PPM: i32 = 60_000;

/// Whether a raw CO2 value lies inside the sensor's valid range
pub const fn is_valid_co2(ppm: i32) -> bool {
    ppm > CO2_MIN_EXCLUSIVE_PPM && ppm < CO2_MAX_EXCLUSIVE_PPM
}

/// Owns the sensor drivers and the latest readings.
///
/// This is the only writer of [`SensorReadings`]; everything else reads them
/// through [`SensorAcquisition::readings`].
pub struct SensorAcquisition<P, C, T, D> {
    particulate: P,
    co2: C,
    climate: T,
    delay: D,
    capabilities: Capabilities,
    co2_retry: RetryPolicy,
    co2_retry_delay_ms: u32,
    readings: SensorReadings,
}

impl<P, C, T, D> SensorAcquisition<P, C, T, D>
where
    P: ParticulateSensor,
    C: Co2Sensor,
    T: ClimateSensor,
    D: DelayNs,
{
    pub fn new(particulate: P, co2: C, climate: T, delay: D, capabilities: Capabilities) -> Self {
        Self {
            particulate,
            co2,
            climate,
            delay,
            capabilities,
            co2_retry: RetryPolicy::Unbounded,
            co2_retry_delay_ms: DEFAULT_CO2_RETRY_DELAY_MS,
            readings: SensorReadings::default(),
        }
    }

    pub fn from_config(config: &NodeConfig, particulate: P, co2: C, climate: T, delay: D) -> Self {
        Self::new(particulate, co2, climate, delay, config.capabilities)
            .with_co2_retry(config.co2_retry, config.co2_retry_delay_ms)
    }

    pub fn with_co2_retry(mut self, policy: RetryPolicy, delay_ms: u32) -> Self {
        self.co2_retry = policy;
        self.co2_retry_delay_ms = delay_ms;
        self
    }

    pub fn readings(&self) -> &SensorReadings {
        &self.readings
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn particulate(&self) -> &P {
        &self.particulate
    }

    pub fn co2(&self) -> &C {
        &self.co2
    }

    pub fn climate(&self) -> &T {
        &self.climate
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Read CO2 until the sensor reports a value inside `(0, 60000)` ppm.
    ///
    /// Out-of-range values and driver errors are logged and retried after a
    /// fixed delay. With [`RetryPolicy::Unbounded`] this only returns once a
    /// valid value arrives, so it may block the caller indefinitely.
    pub async fn read_co2(&mut self) -> Result<i32, SensorError> {
        if !self.capabilities.co2 {
            return Err(SensorError::Disabled { sensor: C::NAME });
        }

        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);

            match self.co2.read().await {
                Ok(ppm) if is_valid_co2(ppm) => {
                    self.readings.co2 = Some(ppm);
                    return Ok(ppm);
                }
                Ok(ppm) => warn!("Wrong CO2 reading: {}", ppm),
                Err(e) => warn!("CO2 read attempt {} failed: {}", attempts, e),
            }

            if !self.co2_retry.allows_another(attempts) {
                error!("{} gave no valid reading after {} attempts", C::NAME, attempts);
                return Err(SensorError::RetriesExhausted {
                    sensor: C::NAME,
                    attempts,
                });
            }

            self.delay.delay_ms(self.co2_retry_delay_ms).await;
        }
    }

    /// Last cached PM2.5 value, without touching the hardware
    pub fn last_pm25(&self) -> Option<i32> {
        self.readings.pm25
    }

    /// Take a fresh PM2.5 reading from the hardware.
    ///
    /// A positive value replaces the cached one. The raw value is returned
    /// either way so the caller can tell whether the cache moved; a driver
    /// error is reported as `0`.
    pub async fn refresh_pm25(&mut self) -> i32 {
        if !self.capabilities.particulate {
            warn!("{} refresh requested but the sensor is disabled", P::NAME);
            return 0;
        }

        let raw = match self.particulate.read().await {
            Ok(raw) => raw,
            Err(e) => {
                error!("{} read failed: {}", P::NAME, e);
                0
            }
        };

        if raw > 0 {
            self.readings.pm25 = Some(raw);
        }

        info!("Set PM2 to {:?} (raw {})", self.readings.pm25, raw);
        raw
    }

    /// Combined temperature/humidity read, trusted as-is
    pub async fn read_climate(&mut self) -> Result<ClimateReading, SensorError> {
        if !self.capabilities.climate {
            return Err(SensorError::Disabled { sensor: T::NAME });
        }

        let reading = self.climate.read().await.map_err(|e| {
            error!("{} measurement failed: {}", T::NAME, e);
            e
        })?;

        self.readings.temperature_c = Some(reading.temperature_c);
        self.readings.humidity_pct = Some(reading.humidity_pct);

        Ok(reading)
    }

    pub async fn wake_particulate(&mut self) -> Result<(), SensorError> {
        if !self.capabilities.particulate {
            return Err(SensorError::Disabled { sensor: P::NAME });
        }
        self.particulate.wake().await
    }

    pub async fn sleep_particulate(&mut self) -> Result<(), SensorError> {
        if !self.capabilities.particulate {
            return Err(SensorError::Disabled { sensor: P::NAME });
        }
        self.particulate.sleep().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::Sensor;
    use crate::sensors::testing::{CountingDelay, ScriptedClimate, ScriptedCo2, ScriptedParticulate};
    use embassy_futures::block_on;

    type TestAcquisition =
        SensorAcquisition<ScriptedParticulate, ScriptedCo2, ScriptedClimate, CountingDelay>;

    fn acquisition(pm: &[i32], co2: &[i32], capabilities: Capabilities) -> TestAcquisition {
        SensorAcquisition::new(
            ScriptedParticulate::new(pm),
            ScriptedCo2::new(co2),
            ScriptedClimate::constant(21.5, 45.0),
            CountingDelay::default(),
            capabilities,
        )
    }

    #[test]
    fn test_valid_co2_range_is_open() {
        assert!(!is_valid_co2(0));
        assert!(is_valid_co2(1));
        assert!(is_valid_co2(59_999));
        assert!(!is_valid_co2(60_000));
        assert!(!is_valid_co2(-1));
    }

    #[test]
    fn test_read_co2_skips_invalid_values() {
        let mut acq = acquisition(&[], &[0, -5, 60_000, 65_535, 415, 900], Capabilities::all());

        let ppm = block_on(acq.read_co2()).unwrap();

        assert_eq!(ppm, 415);
        assert_eq!(acq.co2().reads(), 5);
        assert_eq!(acq.readings().co2, Some(415));
        // One retry delay per rejected value
        assert_eq!(acq.delay().total_ns(), 4 * u64::from(DEFAULT_CO2_RETRY_DELAY_MS) * 1_000_000);
    }

    #[test]
    fn test_read_co2_retries_driver_errors() {
        let mut acq = SensorAcquisition::new(
            ScriptedParticulate::new(&[]),
            ScriptedCo2::with_failures(3, &[800]),
            ScriptedClimate::constant(21.5, 45.0),
            CountingDelay::default(),
            Capabilities::all(),
        );

        assert_eq!(block_on(acq.read_co2()), Ok(800));
        assert_eq!(acq.co2().reads(), 4);
    }

    #[test]
    fn test_read_co2_bounded_retries_give_up() {
        let mut acq = acquisition(&[], &[0, 0, 0, 0, 415], Capabilities::all())
            .with_co2_retry(RetryPolicy::Bounded(3), 1);

        let result = block_on(acq.read_co2());

        assert_eq!(
            result,
            Err(SensorError::RetriesExhausted {
                sensor: ScriptedCo2::NAME,
                attempts: 3
            })
        );
        assert_eq!(acq.co2().reads(), 3);
        assert_eq!(acq.readings().co2, None);
    }

    #[test]
    fn test_read_co2_disabled_never_touches_driver() {
        let mut acq = acquisition(&[], &[415], Capabilities::all().without_co2());

        assert!(matches!(
            block_on(acq.read_co2()),
            Err(SensorError::Disabled { .. })
        ));
        assert_eq!(acq.co2().reads(), 0);
        assert_eq!(acq.readings().co2, None);
    }

    #[test]
    fn test_refresh_pm25_positive_updates_cache() {
        let mut acq = acquisition(&[12, 17], &[], Capabilities::all());

        assert_eq!(block_on(acq.refresh_pm25()), 12);
        assert_eq!(acq.last_pm25(), Some(12));

        assert_eq!(block_on(acq.refresh_pm25()), 17);
        assert_eq!(acq.last_pm25(), Some(17));
    }

    #[test]
    fn test_refresh_pm25_non_positive_keeps_cache() {
        let mut acq = acquisition(&[12, 0, -1], &[], Capabilities::all());

        assert_eq!(block_on(acq.refresh_pm25()), 12);
        assert_eq!(block_on(acq.refresh_pm25()), 0);
        assert_eq!(acq.last_pm25(), Some(12));
        assert_eq!(block_on(acq.refresh_pm25()), -1);
        assert_eq!(acq.last_pm25(), Some(12));
    }

    #[test]
    fn test_refresh_pm25_before_any_valid_reading() {
        let mut acq = acquisition(&[0], &[], Capabilities::all());

        assert_eq!(block_on(acq.refresh_pm25()), 0);
        assert_eq!(acq.last_pm25(), None);
    }

    #[test]
    fn test_read_climate_updates_both_fields() {
        let mut acq = acquisition(&[], &[], Capabilities::all());

        let reading = block_on(acq.read_climate()).unwrap();

        assert_eq!(reading.temperature_c, 21.5);
        assert_eq!(acq.readings().temperature_c, Some(21.5));
        assert_eq!(acq.readings().humidity_pct, Some(45.0));
    }

    #[test]
    fn test_read_climate_failure_leaves_readings() {
        let mut acq = SensorAcquisition::new(
            ScriptedParticulate::new(&[]),
            ScriptedCo2::new(&[]),
            ScriptedClimate::failing(),
            CountingDelay::default(),
            Capabilities::all(),
        );

        assert!(block_on(acq.read_climate()).is_err());
        assert_eq!(acq.readings().temperature_c, None);
        assert_eq!(acq.readings().humidity_pct, None);
    }
}
