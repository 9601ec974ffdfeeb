use airnode_core::sensors::pms5003::{FrameAssembler, Pms5003Frame, SLEEP_COMMAND, WAKE_COMMAND};
use airnode_core::sensors::{PowerControl, Sensor, SensorError};
use embassy_time::{Duration, with_timeout};
use embedded_io_async::{Read, Write};
use log::warn;

const NAME: &str = "PMS5003";

/// The sensor sends a frame roughly every second while awake
const FRAME_TIMEOUT: Duration = Duration::from_secs(3);

/// PMS5003 on a UART, reporting atmospheric PM2.5 in µg/m³
pub struct Pms5003Sensor<U> {
    uart: U,
    assembler: FrameAssembler,
}

impl<U> Pms5003Sensor<U>
where
    U: Read + Write,
{
    pub fn new(uart: U) -> Self {
        Self {
            uart,
            assembler: FrameAssembler::new(),
        }
    }

    async fn next_frame(&mut self) -> Result<Pms5003Frame, SensorError> {
        let mut chunk = [0u8; 32];

        loop {
            let n = self.uart.read(&mut chunk).await.map_err(|_| SensorError::ReadFailed {
                sensor: NAME,
                operation: "read frame",
                details: "UART read error",
            })?;

            for &byte in &chunk[..n] {
                match self.assembler.push(byte) {
                    Some(Ok(frame)) => return Ok(frame),
                    Some(Err(e)) => warn!("Dropping frame: {}", e),
                    None => {}
                }
            }
        }
    }

    async fn send(&mut self, command: &[u8; 7], name: &'static str) -> Result<(), SensorError> {
        let failed = |_| SensorError::PowerCommandFailed {
            sensor: NAME,
            command: name,
            details: "UART write error",
        };

        self.uart.write_all(command).await.map_err(failed)?;
        self.uart.flush().await.map_err(failed)
    }
}

impl<U> Sensor for Pms5003Sensor<U>
where
    U: Read + Write,
{
    const NAME: &'static str = NAME;
    type Reading = i32;

    async fn read(&mut self) -> Result<i32, SensorError> {
        self.assembler.reset();

        let frame = with_timeout(FRAME_TIMEOUT, self.next_frame())
            .await
            .map_err(|_| SensorError::ReadFailed {
                sensor: NAME,
                operation: "read frame",
                details: "no frame before timeout",
            })??;

        Ok(i32::from(frame.pm2_5_atmospheric))
    }
}

impl<U> PowerControl for Pms5003Sensor<U>
where
    U: Read + Write,
{
    async fn wake(&mut self) -> Result<(), SensorError> {
        self.send(&WAKE_COMMAND, "wake").await
    }

    async fn sleep(&mut self) -> Result<(), SensorError> {
        self.send(&SLEEP_COMMAND, "sleep").await
    }
}
