#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::fmt::Write;

use airnode_core::node::AirNode;
use airnode_core::sensors::SensorAcquisition;
use airnode_core::ui::{StatusDisplay, TextPanel, TextSize};
use airnode_firmware::app_state::{
    self, create_i2c_bus, create_pms_uart, init_board_power, init_display, sensor_i2c,
};
use airnode_firmware::net;
use airnode_firmware::sensors::*;
use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_time::Instant;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use esp_hal::clock::CpuClock;
use esp_hal::efuse::Efuse;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};
use static_cell::StaticCell;

/// Where the two status lines start on the 320x240 panel
const PANEL_ORIGIN: Point = Point::new(100, 90);

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized");

    let mac = Efuse::mac_address();
    let node_config = app_state::node_config(mac);

    // Display first so bring-up progress is visible
    let i2c_bus = create_i2c_bus(peripherals.I2C0, peripherals.GPIO12, peripherals.GPIO11)
        .expect("Failed to create I2C bus");
    init_board_power(i2c_bus)
        .await
        .expect("Failed to power the display");
    let display = init_display(
        peripherals.SPI2,
        peripherals.GPIO36,
        peripherals.GPIO37,
        peripherals.GPIO35,
        peripherals.GPIO34,
    )
    .expect("Failed to initialize display");

    let mut panel =
        TextPanel::new(display, Rgb565::WHITE, Rgb565::BLACK).with_origin(PANEL_ORIGIN);
    if let Err(e) = panel.show("Init", &node_config.identity.mac.chip_id(), TextSize::Small) {
        error!("Failed to draw boot screen: {:?}", e);
    }

    // WiFi and network stack
    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio = RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));
    let (wifi_controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());

    // One socket per web task plus DHCP and DNS
    static RESOURCES: StaticCell<StackResources<{ net::WEB_TASK_POOL_SIZE + 2 }>> =
        StaticCell::new();
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        app_state::network_config(&node_config),
        RESOURCES.init(StackResources::new()),
        seed,
    );

    spawner.must_spawn(net::connection(wifi_controller));
    spawner.must_spawn(net::net_task(runner));

    if let Err(e) = panel.show("Trying to", "connect...", TextSize::Small) {
        error!("Failed to draw connecting screen: {:?}", e);
    }
    let address = net::wait_for_address(stack).await;
    info!("Got address {}", address);

    // Sensors and node
    let particulate = particulate_driver(create_pms_uart(
        peripherals.UART1,
        peripherals.GPIO18,
        peripherals.GPIO17,
    ));
    let co2 = co2_driver(sensor_i2c(i2c_bus));
    let climate = climate_driver(sensor_i2c(i2c_bus));

    let acquisition = SensorAcquisition::from_config(
        &node_config,
        particulate,
        co2,
        climate,
        embassy_time::Delay,
    );
    let mut node: app_state::FirmwareNode = AirNode::new(
        &node_config,
        acquisition,
        panel,
        Instant::now().as_millis(),
    );

    let mut listening = heapless::String::<24>::new();
    let _ = write!(listening, "{}:{}", address, node_config.port);
    if let Err(e) = node.show_status("Listening To", &listening) {
        error!("Failed to draw listening screen: {:?}", e);
    }
    info!("Listening on {}", listening);

    for task_id in 0..net::WEB_TASK_POOL_SIZE {
        spawner.must_spawn(net::web_task(task_id, stack, node_config.port));
    }

    node.start().await;
    net::run_node(&mut node).await
}

#[cfg(feature = "sensor-pm")]
fn particulate_driver(uart: Result<BoardUart, app_state::NodeError>) -> ParticulateDriver {
    Pms5003Sensor::new(uart.expect("Failed to configure PMS5003 UART"))
}

#[cfg(not(feature = "sensor-pm"))]
fn particulate_driver(_uart: Result<BoardUart, app_state::NodeError>) -> ParticulateDriver {
    Absent::default()
}

#[cfg(feature = "sensor-co2")]
fn co2_driver(i2c: airnode_firmware::async_i2c_bus::BoardI2cDevice) -> Co2Driver {
    Scd41Sensor::new(i2c)
}

#[cfg(not(feature = "sensor-co2"))]
fn co2_driver(_i2c: airnode_firmware::async_i2c_bus::BoardI2cDevice) -> Co2Driver {
    Absent::default()
}

#[cfg(feature = "sensor-sht")]
fn climate_driver(i2c: airnode_firmware::async_i2c_bus::BoardI2cDevice) -> ClimateDriver {
    Sht40Sensor::new(i2c)
}

#[cfg(not(feature = "sensor-sht"))]
fn climate_driver(_i2c: airnode_firmware::async_i2c_bus::BoardI2cDevice) -> ClimateDriver {
    Absent::default()
}
