//! Synthetic sensors so the node can run without hardware.
//!
//! Values vary smoothly over simulated time. The particulate sensor behaves
//! like the real one around its duty cycle: no data while asleep and zeros
//! while the fan spins up after a wake.

use std::time::{Duration, Instant};

use airnode_core::sensors::{ClimateReading, PowerControl, Sensor, SensorError};
use embedded_hal_async::delay::DelayNs;

/// Every this many reads the CO2 sensor returns 0, exercising the retry path
const CO2_GLITCH_EVERY: u32 = 7;

/// Monotonic millisecond clock, optionally running faster than real time
#[derive(Debug, Clone, Copy)]
pub struct SimClock {
    origin: Instant,
    speed: u32,
}

impl SimClock {
    pub fn new(speed: u32) -> Self {
        Self {
            origin: Instant::now(),
            speed: speed.max(1),
        }
    }

    /// Simulated milliseconds since the clock was created
    pub fn now_ms(&self) -> u64 {
        let elapsed = self.origin.elapsed().as_millis() as u64;
        elapsed.saturating_mul(u64::from(self.speed))
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    /// Real time left until the simulated `deadline_ms`
    pub fn wall_time_until(&self, deadline_ms: u64) -> Duration {
        let left = deadline_ms.saturating_sub(self.now_ms());
        Duration::from_millis(left / u64::from(self.speed))
    }
}

/// PM2.5 in µg/m³: 5–35 with a slow cycle
pub fn pm25_at(t_ms: u64) -> i32 {
    let t = t_ms as f64 / 1000.0;
    (20.0 + 12.0 * (t / 600.0).sin() + 3.0 * (t / 53.0).cos()).round() as i32
}

/// CO2 in ppm: 400–800 with a longer cycle
pub fn co2_at(t_ms: u64) -> i32 {
    let t = t_ms as f64 / 1000.0;
    (600.0 + 200.0 * (t / 300.0).sin() + 30.0 * (t / 41.0).cos()).round() as i32
}

/// Temperature 20–26 °C and humidity 40–60 %
pub fn climate_at(t_ms: u64) -> ClimateReading {
    let t = t_ms as f64 / 1000.0;
    ClimateReading {
        temperature_c: (23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos()) as f32,
        humidity_pct: (50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos()) as f32,
    }
}

pub struct SyntheticParticulate {
    clock: SimClock,
    warm_up_ms: u64,
    woken_at: Option<u64>,
}

impl SyntheticParticulate {
    /// Starts asleep, like a sensor that has not been commanded yet
    pub fn new(clock: SimClock, warm_up_ms: u64) -> Self {
        Self {
            clock,
            warm_up_ms,
            woken_at: None,
        }
    }

    pub fn is_awake(&self) -> bool {
        self.woken_at.is_some()
    }
}

impl Sensor for SyntheticParticulate {
    const NAME: &'static str = "PMS5003";
    type Reading = i32;

    async fn read(&mut self) -> Result<i32, SensorError> {
        let Some(woken_at) = self.woken_at else {
            return Err(SensorError::ReadFailed {
                sensor: Self::NAME,
                operation: "frame",
                details: "sensor is asleep",
            });
        };

        let now = self.clock.now_ms();
        if now.saturating_sub(woken_at) < self.warm_up_ms {
            return Ok(0);
        }

        Ok(pm25_at(now))
    }
}

impl PowerControl for SyntheticParticulate {
    async fn wake(&mut self) -> Result<(), SensorError> {
        if self.woken_at.is_none() {
            self.woken_at = Some(self.clock.now_ms());
        }
        Ok(())
    }

    async fn sleep(&mut self) -> Result<(), SensorError> {
        self.woken_at = None;
        Ok(())
    }
}

pub struct SyntheticCo2 {
    clock: SimClock,
    reads: u32,
}

impl SyntheticCo2 {
    pub fn new(clock: SimClock) -> Self {
        Self { clock, reads: 0 }
    }
}

impl Sensor for SyntheticCo2 {
    const NAME: &'static str = "SCD41";
    type Reading = i32;

    async fn read(&mut self) -> Result<i32, SensorError> {
        self.reads = self.reads.wrapping_add(1);
        if self.reads % CO2_GLITCH_EVERY == 0 {
            return Ok(0);
        }
        Ok(co2_at(self.clock.now_ms()))
    }
}

pub struct SyntheticClimate {
    clock: SimClock,
}

impl SyntheticClimate {
    pub fn new(clock: SimClock) -> Self {
        Self { clock }
    }
}

impl Sensor for SyntheticClimate {
    const NAME: &'static str = "SHT40";
    type Reading = ClimateReading;

    async fn read(&mut self) -> Result<ClimateReading, SensorError> {
        Ok(climate_at(self.clock.now_ms()))
    }
}

/// Delay on the tokio timer, so the HTTP server keeps running meanwhile
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

impl DelayNs for TokioDelay {
    async fn delay_ns(&mut self, ns: u32) {
        tokio::time::sleep(Duration::from_nanos(u64::from(ns))).await;
    }
}
