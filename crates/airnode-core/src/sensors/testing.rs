//! Scripted sensor and display fakes shared by the unit tests

use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_hal_async::delay::DelayNs;

use super::{ClimateReading, PowerControl, Sensor, SensorError};
use crate::ui::{StatusDisplay, TextSize};

const SCRIPT_EXHAUSTED: SensorError = SensorError::ReadFailed {
    sensor: "scripted",
    operation: "read",
    details: "script exhausted",
};

/// Particulate fake that replays a fixed list of raw values
#[derive(Default)]
pub struct ScriptedParticulate {
    values: VecDeque<i32>,
    reads: usize,
    wakes: usize,
    sleeps: usize,
    fail_sleep: bool,
}

impl ScriptedParticulate {
    pub fn new(values: &[i32]) -> Self {
        Self {
            values: values.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn failing_sleep(mut self) -> Self {
        self.fail_sleep = true;
        self
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn wakes(&self) -> usize {
        self.wakes
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps
    }
}

impl Sensor for ScriptedParticulate {
    const NAME: &'static str = "scripted-pm";
    type Reading = i32;

    async fn read(&mut self) -> Result<i32, SensorError> {
        self.reads += 1;
        self.values.pop_front().ok_or(SCRIPT_EXHAUSTED)
    }
}

impl PowerControl for ScriptedParticulate {
    async fn wake(&mut self) -> Result<(), SensorError> {
        self.wakes += 1;
        Ok(())
    }

    async fn sleep(&mut self) -> Result<(), SensorError> {
        if self.fail_sleep {
            return Err(SensorError::PowerCommandFailed {
                sensor: Self::NAME,
                command: "sleep",
                details: "scripted failure",
            });
        }
        self.sleeps += 1;
        Ok(())
    }
}

/// CO2 fake: a number of driver errors followed by a list of raw values
#[derive(Default)]
pub struct ScriptedCo2 {
    failures: usize,
    values: VecDeque<i32>,
    reads: usize,
}

impl ScriptedCo2 {
    pub fn new(values: &[i32]) -> Self {
        Self::with_failures(0, values)
    }

    pub fn with_failures(failures: usize, values: &[i32]) -> Self {
        Self {
            failures,
            values: values.iter().copied().collect(),
            reads: 0,
        }
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl Sensor for ScriptedCo2 {
    const NAME: &'static str = "scripted-co2";
    type Reading = i32;

    async fn read(&mut self) -> Result<i32, SensorError> {
        self.reads += 1;
        if self.failures > 0 {
            self.failures -= 1;
            return Err(SensorError::ReadFailed {
                sensor: Self::NAME,
                operation: "read",
                details: "scripted bus error",
            });
        }
        self.values.pop_front().ok_or(SCRIPT_EXHAUSTED)
    }
}

/// Climate fake returning the same reading every time, or always failing
pub struct ScriptedClimate {
    reading: Option<ClimateReading>,
    reads: usize,
}

impl ScriptedClimate {
    pub fn constant(temperature_c: f32, humidity_pct: f32) -> Self {
        Self {
            reading: Some(ClimateReading {
                temperature_c,
                humidity_pct,
            }),
            reads: 0,
        }
    }

    pub fn failing() -> Self {
        Self {
            reading: None,
            reads: 0,
        }
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl Sensor for ScriptedClimate {
    const NAME: &'static str = "scripted-sht";
    type Reading = ClimateReading;

    async fn read(&mut self) -> Result<ClimateReading, SensorError> {
        self.reads += 1;
        self.reading.ok_or(SCRIPT_EXHAUSTED)
    }
}

/// Delay that returns immediately and remembers how long it was asked to wait
#[derive(Default)]
pub struct CountingDelay {
    total_ns: u64,
}

impl CountingDelay {
    pub fn total_ns(&self) -> u64 {
        self.total_ns
    }
}

impl DelayNs for CountingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

/// One call to [`StatusDisplay::show`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub title: String,
    pub value: String,
    pub size: TextSize,
}

/// Display fake that records every frame it is asked to show
#[derive(Default)]
pub struct RecordingDisplay {
    pub frames: Vec<Frame>,
}

impl RecordingDisplay {
    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }
}

impl StatusDisplay for RecordingDisplay {
    type Error = Infallible;

    fn show(&mut self, title: &str, value: &str, size: TextSize) -> Result<(), Infallible> {
        self.frames.push(Frame {
            title: title.to_string(),
            value: value.to_string(),
            size,
        });
        Ok(())
    }
}
