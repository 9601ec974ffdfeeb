//! Desktop simulator for the airnode air-quality sensor node.
//!
//! Runs the same node logic as the firmware against synthetic sensors and
//! serves the metrics endpoint with warp on a local TCP port, so collectors
//! and dashboards can be tried out without hardware. The status display is
//! rendered off-screen and mirrored into the log; with the `window` feature
//! it is also shown in an SDL2 window.
//!
//! # Key bindings (`window` feature)
//!
//! | Key   | Action |
//! |-------|--------|
//! | Q/Esc | Quit   |

mod display;
mod options;
mod server;
mod synthetic;

use std::net::SocketAddr;
use std::time::Duration;

use airnode_core::node::AirNode;
use airnode_core::sensors::SensorAcquisition;
use airnode_core::ui::{StatusDisplay, TextPanel, TextSize};
use color_eyre::eyre::{Result, WrapErr};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay};
use log::{debug, info, warn};
use structopt::StructOpt;

use display::LoggingDisplay;
use options::Options;
use server::{NodeHandle, NodeRequest};
use synthetic::{SimClock, SyntheticClimate, SyntheticCo2, SyntheticParticulate, TokioDelay};

/// Size of the simulated status display
const DISPLAY_SIZE: Size = Size::new(128, 64);

/// Pixel scale factor for the window and snapshots
const WINDOW_SCALE: u32 = 4;

/// Longest the node loop idles, which is also the window refresh period
const MAX_IDLE: Duration = Duration::from_millis(100);

/// Requests queued for the node before the server waits
const REQUEST_QUEUE: usize = 16;

type SimPanel = LoggingDisplay<TextPanel<SimulatorDisplay<BinaryColor>>>;

type SimNode = AirNode<SyntheticParticulate, SyntheticCo2, SyntheticClimate, TokioDelay, SimPanel>;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = Options::from_args();
    let config = options.node_config()?;

    info!("Starting airnode simulator");
    info!(
        "Device id {:?}, MAC {}, speed {}x",
        config.identity.id.as_str(),
        config.identity.mac,
        options.speed
    );
    info!("Capabilities: {:?}", config.capabilities);
    #[cfg(feature = "window")]
    info!("Keys: Q=Quit");

    let clock = SimClock::new(options.speed);

    let mut panel = LoggingDisplay::new(TextPanel::new(
        SimulatorDisplay::<BinaryColor>::new(DISPLAY_SIZE),
        BinaryColor::On,
        BinaryColor::Off,
    ));
    // Drawing into the off-screen buffer cannot fail
    let _ = panel.show("Init", &config.identity.mac.chip_id(), TextSize::Small);

    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    #[cfg(feature = "window")]
    let mut window = preview::Preview::new(&output_settings, panel.inner().target());

    let (node_handle, mut requests) = NodeHandle::new(REQUEST_QUEUE);
    let address = SocketAddr::new(options.bind, config.port);
    let (local, server) = warp::serve(server::routes(node_handle))
        .try_bind_ephemeral(address)
        .wrap_err_with(|| format!("could not listen on {}", address))?;
    tokio::spawn(server);

    let acquisition = SensorAcquisition::from_config(
        &config,
        SyntheticParticulate::new(clock, options.pm_warm_up_ms),
        SyntheticCo2::new(clock),
        SyntheticClimate::new(clock),
        TokioDelay,
    );
    let mut node: SimNode = AirNode::new(&config, acquisition, panel, clock.now_ms());

    let _ = node.show_status("Listening To", &local.to_string());
    info!("Listening on {}", local);

    node.start().await;

    let shutdown = shutdown_signal(options.run_for_secs.map(Duration::from_secs));
    tokio::pin!(shutdown);

    loop {
        let ran = node.tick(clock.now_ms()).await;
        if ran > 0 {
            debug!("Ran {} task(s), readings {:?}", ran, node.readings());
        }

        let idle = node
            .next_deadline()
            .map_or(MAX_IDLE, |deadline| clock.wall_time_until(deadline))
            .min(MAX_IDLE);

        tokio::select! {
            Some(NodeRequest { request, reply }) = requests.recv() => {
                let response = node.handle_request(&request);
                // The client may have hung up meanwhile
                let _ = reply.send(response);
            }
            _ = tokio::time::sleep(idle) => {}
            _ = &mut shutdown => break,
        }

        #[cfg(feature = "window")]
        if !window.refresh(node.display().inner().target()) {
            break;
        }
    }

    info!("Final readings: {:?}", node.readings());

    if let Some(path) = &options.snapshot {
        node.display()
            .inner()
            .target()
            .to_rgb_output_image(&output_settings)
            .save_png(path)
            .wrap_err_with(|| format!("could not save snapshot to {}", path.display()))?;
        info!("Saved display snapshot to {}", path.display());
    }

    info!("Simulator exiting");
    Ok(())
}

/// Resolves on Ctrl-C, or once `run_for` has elapsed when given
async fn shutdown_signal(run_for: Option<Duration>) {
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match run_for {
        Some(run_for) => tokio::select! {
            _ = interrupted => info!("Interrupted"),
            _ = tokio::time::sleep(run_for) => info!("Run time elapsed"),
        },
        None => {
            interrupted.await;
            info!("Interrupted");
        }
    }
}

#[cfg(feature = "window")]
mod preview {
    use embedded_graphics::pixelcolor::BinaryColor;
    use embedded_graphics_simulator::{
        OutputSettings, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
    };

    pub struct Preview {
        window: Window,
    }

    impl Preview {
        pub fn new(settings: &OutputSettings, display: &SimulatorDisplay<BinaryColor>) -> Self {
            let mut window = Window::new("airnode simulator", settings);
            // The SDL window is created on the first update, which has to
            // happen before events() is called
            window.update(display);
            Self { window }
        }

        /// Redraw the window; false once the user asked to quit
        pub fn refresh(&mut self, display: &SimulatorDisplay<BinaryColor>) -> bool {
            self.window.update(display);

            for event in self.window.events() {
                match event {
                    SimulatorEvent::Quit => return false,
                    SimulatorEvent::KeyDown { keycode, .. }
                        if keycode == Keycode::Q || keycode == Keycode::Escape =>
                    {
                        return false;
                    }
                    _ => {}
                }
            }

            true
        }
    }
}
