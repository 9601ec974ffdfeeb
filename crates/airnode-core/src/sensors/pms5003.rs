//! Plantower PMS5003 serial protocol
//!
//! The sensor streams 32-byte frames over UART while awake and accepts 7-byte
//! command frames for sleep/wake. Only frame decoding and command encoding live
//! here; moving bytes over the UART is up to the firmware driver.

use super::SensorError;

const SENSOR: &str = "PMS5003";

/// Length of one data frame including start bytes and checksum
pub const FRAME_LEN: usize = 32;

/// Every frame, data or command, starts with these two bytes
pub const START_BYTES: [u8; 2] = [0x42, 0x4D];

/// Payload length announced in bytes 2..4 of a data frame
const DATA_LENGTH: u16 = 28;

const COMMAND_SLEEP_WAKE: u8 = 0xE4;

/// Put the sensor into its low-power sleep state (fan and laser off)
pub const SLEEP_COMMAND: [u8; 7] = command(COMMAND_SLEEP_WAKE, 0x0000);

/// Wake the sensor; the first valid frames follow roughly 30 s later
pub const WAKE_COMMAND: [u8; 7] = command(COMMAND_SLEEP_WAKE, 0x0001);

/// Encode a command frame with its trailing checksum
pub const fn command(cmd: u8, data: u16) -> [u8; 7] {
    let [data_h, data_l] = data.to_be_bytes();
    let sum = START_BYTES[0] as u16
        + START_BYTES[1] as u16
        + cmd as u16
        + data_h as u16
        + data_l as u16;
    let [sum_h, sum_l] = sum.to_be_bytes();
    [START_BYTES[0], START_BYTES[1], cmd, data_h, data_l, sum_h, sum_l]
}

/// Concentrations reported in one data frame, µg/m³
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pms5003Frame {
    pub pm1_0_standard: u16,
    pub pm2_5_standard: u16,
    pub pm10_standard: u16,
    pub pm1_0_atmospheric: u16,
    pub pm2_5_atmospheric: u16,
    pub pm10_atmospheric: u16,
}

impl Pms5003Frame {
    /// Decode and checksum-verify a complete data frame
    pub fn parse(bytes: &[u8; FRAME_LEN]) -> Result<Self, SensorError> {
        if bytes[..2] != START_BYTES {
            return Err(SensorError::InvalidFrame {
                sensor: SENSOR,
                details: "missing start bytes",
            });
        }

        if word(bytes, 2) != DATA_LENGTH {
            return Err(SensorError::InvalidFrame {
                sensor: SENSOR,
                details: "unexpected frame length",
            });
        }

        let sum = bytes[..FRAME_LEN - 2]
            .iter()
            .fold(0u16, |acc, b| acc.wrapping_add(u16::from(*b)));
        if sum != word(bytes, FRAME_LEN - 2) {
            return Err(SensorError::InvalidFrame {
                sensor: SENSOR,
                details: "checksum mismatch",
            });
        }

        Ok(Self {
            pm1_0_standard: word(bytes, 4),
            pm2_5_standard: word(bytes, 6),
            pm10_standard: word(bytes, 8),
            pm1_0_atmospheric: word(bytes, 10),
            pm2_5_atmospheric: word(bytes, 12),
            pm10_atmospheric: word(bytes, 14),
        })
    }
}

fn word(bytes: &[u8; FRAME_LEN], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

/// Reassembles data frames from an arbitrary byte stream.
///
/// Bytes before a start sequence are discarded, so the assembler resyncs on
/// its own after a partial or corrupted frame.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    buffer: [u8; FRAME_LEN],
    len: usize,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub const fn new() -> Self {
        Self {
            buffer: [0; FRAME_LEN],
            len: 0,
        }
    }

    /// Feed one byte; yields a result each time a full frame has been collected
    pub fn push(&mut self, byte: u8) -> Option<Result<Pms5003Frame, SensorError>> {
        match self.len {
            0 if byte != START_BYTES[0] => return None,
            1 if byte != START_BYTES[1] => {
                // A repeated first start byte may still begin a frame
                self.len = usize::from(byte == START_BYTES[0]);
                return None;
            }
            _ => {}
        }

        self.buffer[self.len] = byte;
        self.len += 1;

        if self.len < FRAME_LEN {
            return None;
        }

        self.len = 0;
        Some(Pms5003Frame::parse(&self.buffer))
    }

    pub fn reset(&mut self) {
        self.len = 0;
    }
}
