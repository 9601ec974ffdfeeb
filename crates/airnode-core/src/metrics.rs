//! Text exposition of the latest sensor readings
//!
//! Each enabled metric with a value produces a three-line block:
//!
//! ```text
//! # HELP pm02 Particulate Matter PM2.5 value
//! # TYPE pm02 gauge
//! pm02{id="kitchen",mac="5C:CF:7F:01:AB:0E"}12
//! ```
//!
//! Blocks always appear in the order PM2.5, CO2, temperature, humidity. A
//! metric whose sensor is disabled, or that has no reading yet, is omitted.

use alloc::string::String;
use core::fmt::{self, Write};

use crate::config::{Capabilities, DeviceIdentity};
use crate::sensors::{SensorReadings, SensorType};

/// Name and help text of one exported gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricFamily {
    pub name: &'static str,
    pub help: &'static str,
}

impl MetricFamily {
    pub const fn for_sensor(sensor: SensorType) -> Self {
        match sensor {
            SensorType::Pm25 => Self {
                name: "pm02",
                help: "Particulate Matter PM2.5 value",
            },
            SensorType::Co2 => Self {
                name: "rco2",
                help: "CO2 value, in ppm",
            },
            SensorType::Temperature => Self {
                name: "atmp",
                help: "Temperature, in degrees Celsius",
            },
            SensorType::Humidity => Self {
                name: "rhum",
                help: "Relative humidity, in percent",
            },
        }
    }
}

/// A sample value as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq)]
enum SampleValue {
    Integer(i32),
    Decimal(f32),
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Decimal(value) => write!(f, "{value:.2}"),
        }
    }
}

fn sample_value(readings: &SensorReadings, sensor: SensorType) -> Option<SampleValue> {
    match sensor {
        SensorType::Pm25 => readings.pm25.map(SampleValue::Integer),
        SensorType::Co2 => readings.co2.map(SampleValue::Integer),
        SensorType::Temperature => readings.temperature_c.map(SampleValue::Decimal),
        SensorType::Humidity => readings.humidity_pct.map(SampleValue::Decimal),
    }
}

/// Serializes [`SensorReadings`] for a pull-based metrics collector
#[derive(Debug, Clone, Copy)]
pub struct MetricsExporter<'a> {
    identity: &'a DeviceIdentity,
    capabilities: Capabilities,
}

impl<'a> MetricsExporter<'a> {
    pub const fn new(identity: &'a DeviceIdentity, capabilities: Capabilities) -> Self {
        Self {
            identity,
            capabilities,
        }
    }

    /// Stream the exposition document into `out`
    pub fn write_to<W: Write>(&self, readings: &SensorReadings, out: &mut W) -> fmt::Result {
        for sensor in SensorType::ALL {
            if !sensor.is_enabled(self.capabilities) {
                continue;
            }
            if let Some(value) = sample_value(readings, sensor) {
                self.write_block(out, MetricFamily::for_sensor(sensor), value)?;
            }
        }
        Ok(())
    }

    /// Render the exposition document into a new string
    pub fn render(&self, readings: &SensorReadings) -> String {
        let mut document = String::new();
        // Writing into a String cannot fail
        let _ = self.write_to(readings, &mut document);
        document
    }

    fn write_block<W: Write>(
        &self,
        out: &mut W,
        family: MetricFamily,
        value: SampleValue,
    ) -> fmt::Result {
        writeln!(out, "# HELP {} {}", family.name, family.help)?;
        writeln!(out, "# TYPE {} gauge", family.name)?;
        write!(out, "{}{{id=\"", family.name)?;
        write_label_value(out, &self.identity.id)?;
        writeln!(out, "\",mac=\"{}\"}}{}", self.identity.mac, value)
    }
}

/// Escape backslash, double quote and newline inside a label value
fn write_label_value<W: Write>(out: &mut W, value: &str) -> fmt::Result {
    for c in value.chars() {
        match c {
            '\\' => out.write_str("\\\\")?,
            '"' => out.write_str("\\\"")?,
            '\n' => out.write_str("\\n")?,
            c => out.write_char(c)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MacAddress;
    use alloc::vec::Vec;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::new("kitchen", MacAddress([0x5c, 0xcf, 0x7f, 0x01, 0xab, 0x0e])).unwrap()
    }

    fn readings() -> SensorReadings {
        SensorReadings {
            pm25: Some(12),
            co2: Some(415),
            temperature_c: Some(21.5),
            humidity_pct: Some(45.0),
        }
    }

    fn sample_names(document: &str) -> Vec<&str> {
        document
            .lines()
            .filter(|line| !line.starts_with('#'))
            .filter_map(|line| line.split('{').next())
            .collect()
    }

    #[test]
    fn test_all_capabilities_render_four_blocks() {
        let identity = identity();
        let document = MetricsExporter::new(&identity, Capabilities::all()).render(&readings());

        let expected = "\
# HELP pm02 Particulate Matter PM2.5 value
# TYPE pm02 gauge
pm02{id=\"kitchen\",mac=\"5C:CF:7F:01:AB:0E\"}12
# HELP rco2 CO2 value, in ppm
# TYPE rco2 gauge
rco2{id=\"kitchen\",mac=\"5C:CF:7F:01:AB:0E\"}415
# HELP atmp Temperature, in degrees Celsius
# TYPE atmp gauge
atmp{id=\"kitchen\",mac=\"5C:CF:7F:01:AB:0E\"}21.50
# HELP rhum Relative humidity, in percent
# TYPE rhum gauge
rhum{id=\"kitchen\",mac=\"5C:CF:7F:01:AB:0E\"}45.00
";
        assert_eq!(document, expected);
        assert_eq!(document.lines().count(), 12);
        assert_eq!(sample_names(&document), ["pm02", "rco2", "atmp", "rhum"]);
    }

    #[test]
    fn test_disabling_co2_removes_only_its_block() {
        let identity = identity();
        let full = MetricsExporter::new(&identity, Capabilities::all()).render(&readings());
        let without_co2 = MetricsExporter::new(&identity, Capabilities::all().without_co2())
            .render(&readings());

        assert_eq!(sample_names(&without_co2), ["pm02", "atmp", "rhum"]);

        let removed: Vec<&str> = full
            .lines()
            .filter(|line| !without_co2.lines().any(|kept| kept == *line))
            .collect();
        assert_eq!(removed.len(), 3);
        assert!(removed.iter().all(|line| line.contains("rco2")));
    }

    #[test]
    fn test_missing_values_are_omitted_not_zeroed() {
        let identity = identity();
        let readings = SensorReadings {
            co2: Some(600),
            ..SensorReadings::default()
        };

        let document = MetricsExporter::new(&identity, Capabilities::all()).render(&readings);

        assert_eq!(sample_names(&document), ["rco2"]);
        assert!(!document.contains("pm02"));
    }

    #[test]
    fn test_no_readings_renders_empty_document() {
        let identity = identity();
        let document =
            MetricsExporter::new(&identity, Capabilities::all()).render(&SensorReadings::default());

        assert!(document.is_empty());
    }

    #[test]
    fn test_empty_device_id() {
        let identity = DeviceIdentity::default();
        let document = MetricsExporter::new(&identity, Capabilities::all()).render(&SensorReadings {
            pm25: Some(3),
            ..SensorReadings::default()
        });

        assert!(document.ends_with("pm02{id=\"\",mac=\"00:00:00:00:00:00\"}3\n"));
    }

    #[test]
    fn test_label_values_are_escaped() {
        let identity = DeviceIdentity::new("a\"b\\c", MacAddress::default()).unwrap();
        let document = MetricsExporter::new(&identity, Capabilities::all()).render(&SensorReadings {
            co2: Some(500),
            ..SensorReadings::default()
        });

        assert!(document.contains("rco2{id=\"a\\\"b\\\\c\","));
    }
}
