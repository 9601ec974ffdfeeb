//! Hardware initialization for the node
//!
//! Order matters: the power management chip has to enable the LCD rail and
//! the GPIO expander has to release the LCD reset before the display driver
//! can talk to the panel.

use aw9523_embedded::r#async::Aw9523Async;
use axp2101_embedded::AsyncAxp2101;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::uart::{Config as UartConfig, Uart};
use esp_hal::{Blocking, i2c::master::Config as I2cConfig, time::Rate};
use log::info;
use mipidsi::interface::SpiInterface;
use mipidsi::models::ILI9342CRgb565;
use mipidsi::{Builder as MipidsiBuilder, NoResetPin};
use static_cell::StaticCell;

use super::{NodeError, describe};
use crate::async_i2c_bus::{AsyncI2cDevice, BoardI2cDevice, SharedI2c};
use crate::sensors::BoardUart;

pub const DISPLAY_WIDTH: u16 = 320;
pub const DISPLAY_HEIGHT: u16 = 240;

/// The PMS5003 talks 9600 8N1
const PMS_BAUD_RATE: u32 = 9600;

const GPIO_EXPANDER_ADDRESS: u8 = 0x58;

/// AW9523 pin wired to the LCD reset line (P1_1)
const LCD_RESET_PIN: u8 = 9;

/// LCD supply voltage on ALDO4
const LCD_RAIL_MV: u16 = 3300;

type DisplaySpi = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, NoDelay>;

pub type BoardDisplay = mipidsi::Display<
    SpiInterface<'static, DisplaySpi, Output<'static>>,
    ILI9342CRgb565,
    NoResetPin,
>;

/// Create the I2C peripheral (400 kHz) and wrap it for sharing
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO12<'static>,
    scl: esp_hal::peripherals::GPIO11<'static>,
) -> Result<&'static AsyncMutex<CriticalSectionRawMutex, SharedI2c>, NodeError> {
    static I2C0_BUS: StaticCell<AsyncMutex<CriticalSectionRawMutex, SharedI2c>> =
        StaticCell::new();

    let i2c = esp_hal::i2c::master::I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    )
    .map_err(|e| NodeError::Peripheral(describe(e)))?
    .with_sda(sda)
    .with_scl(scl)
    .into_async();

    Ok(I2C0_BUS.init(AsyncMutex::new(i2c)))
}

/// Power the LCD rail and release the LCD from reset
pub async fn init_board_power(
    bus: &'static AsyncMutex<CriticalSectionRawMutex, SharedI2c>,
) -> Result<(), NodeError> {
    info!("Configuring power management");
    let mut power_mgmt = AsyncAxp2101::new(AsyncI2cDevice::new(bus));
    let power_err = |e| NodeError::Power(describe(e));

    power_mgmt.init().await.map_err(power_err)?;
    power_mgmt.enable_aldo4().await.map_err(power_err)?;
    power_mgmt.set_aldo4_voltage(LCD_RAIL_MV).await.map_err(power_err)?;
    power_mgmt.enable_bldo1().await.map_err(power_err)?;
    info!("Power management ready");

    info!("Configuring GPIO expander");
    let mut gpio_expander = Aw9523Async::new(AsyncI2cDevice::new(bus), GPIO_EXPANDER_ADDRESS);
    let expander_err = |e| NodeError::Power(describe(e));

    gpio_expander.init().await.map_err(expander_err)?;
    gpio_expander
        .pin_mode(LCD_RESET_PIN, aw9523_embedded::PinMode::Output)
        .await
        .map_err(expander_err)?;
    gpio_expander
        .digital_write(LCD_RESET_PIN, true)
        .await
        .map_err(expander_err)?;
    info!("LCD released from reset");

    Ok(())
}

/// Device handle for a sensor on the shared bus
pub fn sensor_i2c(bus: &'static AsyncMutex<CriticalSectionRawMutex, SharedI2c>) -> BoardI2cDevice {
    AsyncI2cDevice::new(bus)
}

/// Bring up the ILI9342C panel over SPI2
pub fn init_display(
    spi2: esp_hal::peripherals::SPI2<'static>,
    sck: esp_hal::peripherals::GPIO36<'static>,
    mosi: esp_hal::peripherals::GPIO37<'static>,
    cs: esp_hal::peripherals::GPIO35<'static>,
    dc: esp_hal::peripherals::GPIO34<'static>,
) -> Result<BoardDisplay, NodeError> {
    static SPI_BUFFER: StaticCell<[u8; 512]> = StaticCell::new();

    let spi_bus = Spi::new(spi2, SpiConfig::default())
        .map_err(|e| NodeError::Display(describe(e)))?
        .with_sck(sck)
        .with_mosi(mosi);

    let cs = Output::new(cs, Level::High, OutputConfig::default());
    let spi_device =
        ExclusiveDevice::new_no_delay(spi_bus, cs).map_err(|e| NodeError::Display(describe(e)))?;

    let dc = Output::new(dc, Level::Low, OutputConfig::default());
    let di = SpiInterface::new(spi_device, dc, SPI_BUFFER.init([0; 512]));

    let display = MipidsiBuilder::new(ILI9342CRgb565, di)
        .display_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
        .init(&mut embassy_time::Delay)
        .map_err(|e| NodeError::Display(describe(e)))?;

    info!("Display initialized");
    Ok(display)
}

/// UART1 to the PMS5003
pub fn create_pms_uart(
    uart1: esp_hal::peripherals::UART1<'static>,
    rx: esp_hal::peripherals::GPIO18<'static>,
    tx: esp_hal::peripherals::GPIO17<'static>,
) -> Result<BoardUart, NodeError> {
    let uart = Uart::new(uart1, UartConfig::default().with_baudrate(PMS_BAUD_RATE))
        .map_err(|e| NodeError::Peripheral(describe(e)))?
        .with_rx(rx)
        .with_tx(tx)
        .into_async();

    Ok(uart)
}
