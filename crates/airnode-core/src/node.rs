//! The node context: one owner for the scheduler, the sensors, both state
//! machines and the display
//!
//! The binaries build an [`AirNode`], call [`AirNode::start`] once network and
//! display are up, then loop: [`AirNode::tick`] with the current time, and
//! [`AirNode::handle_request`] for every request their HTTP server hands over,
//! waiting at most until [`AirNode::next_deadline`] in between.

use alloc::string::String;

use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::{DeviceIdentity, NodeConfig, Timing};
use crate::display_rotation::DisplayRotation;
use crate::http::{self, Request, Response};
use crate::metrics::MetricsExporter;
use crate::power_cycle::{PowerCycleController, PowerCycleState};
use crate::scheduler::Scheduler;
use crate::sensors::{
    ClimateSensor, Co2Sensor, ParticulateSensor, SensorAcquisition, SensorReadings,
};
use crate::ui::{StatusDisplay, TextSize};

/// Everything the scheduler can fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTask {
    /// Period trigger of the particulate duty cycle
    WakeParticulate,
    /// End of the particulate sample window
    SleepParticulate,
    /// Show the next metric on the status display
    RotateDisplay,
}

pub struct AirNode<P, C, T, D, S> {
    scheduler: Scheduler<NodeTask>,
    acquisition: SensorAcquisition<P, C, T, D>,
    power_cycle: PowerCycleController,
    rotation: DisplayRotation,
    display: S,
    identity: DeviceIdentity,
    timing: Timing,
    started: bool,
}

impl<P, C, T, D, S> AirNode<P, C, T, D, S>
where
    P: ParticulateSensor,
    C: Co2Sensor,
    T: ClimateSensor,
    D: DelayNs,
    S: StatusDisplay,
{
    pub fn new(
        config: &NodeConfig,
        acquisition: SensorAcquisition<P, C, T, D>,
        display: S,
        start_ms: u64,
    ) -> Self {
        if config.identity.id.is_empty() {
            info!("No device id configured, exporting with board defaults");
        }

        Self {
            scheduler: Scheduler::new(start_ms),
            acquisition,
            power_cycle: PowerCycleController::new(&config.timing),
            rotation: DisplayRotation::new(),
            display,
            identity: config.identity.clone(),
            timing: config.timing,
            started: false,
        }
    }

    /// Start the particulate duty cycle and the display rotation.
    ///
    /// Calling this more than once has no effect.
    pub async fn start(&mut self) {
        if self.started {
            warn!("Node already started");
            return;
        }
        self.started = true;

        if self.acquisition.capabilities().particulate {
            self.power_cycle
                .start(&mut self.acquisition, &mut self.scheduler)
                .await;
        }

        self.scheduler
            .schedule_repeating(self.timing.display_rotation_ms, NodeTask::RotateDisplay);

        info!(
            "Node started with {} scheduled task(s), capabilities {:?}",
            self.scheduler.len(),
            self.acquisition.capabilities()
        );
    }

    /// Run every task due at `now_ms`, in order. Returns how many ran.
    pub async fn tick(&mut self, now_ms: u64) -> usize {
        let due = self.scheduler.tick(now_ms);

        for task in &due {
            debug!("Running {:?} at {} ms", task, now_ms);
            self.dispatch(*task).await;
        }

        due.len()
    }

    async fn dispatch(&mut self, task: NodeTask) {
        match task {
            NodeTask::WakeParticulate => {
                self.power_cycle
                    .wake(&mut self.acquisition, &mut self.scheduler)
                    .await
            }
            NodeTask::SleepParticulate => {
                self.power_cycle
                    .end_sample_window(&mut self.acquisition)
                    .await
            }
            NodeTask::RotateDisplay => {
                self.rotation
                    .advance(&mut self.acquisition, &mut self.display)
                    .await;
            }
        }
    }

    /// Current metrics exposition document
    pub fn metrics(&self) -> String {
        MetricsExporter::new(&self.identity, self.acquisition.capabilities())
            .render(self.acquisition.readings())
    }

    pub fn handle_request(&self, request: &Request) -> Response {
        let response = http::route(request, || self.metrics());
        debug!("{} {} -> {}", request.method, request.path, response.status);
        response
    }

    /// Show a status message in the small font, e.g. during bring-up
    pub fn show_status(&mut self, title: &str, value: &str) -> Result<(), S::Error> {
        self.display.show(title, value, TextSize::Small)
    }

    /// Earliest time at which [`Self::tick`] has work to do
    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_deadline()
    }

    pub fn readings(&self) -> &SensorReadings {
        self.acquisition.readings()
    }

    pub fn power_state(&self) -> PowerCycleState {
        self.power_cycle.state()
    }

    pub fn power_cycle(&self) -> &PowerCycleController {
        &self.power_cycle
    }

    pub fn rotation(&self) -> &DisplayRotation {
        &self.rotation
    }

    pub fn scheduler(&self) -> &Scheduler<NodeTask> {
        &self.scheduler
    }

    pub fn acquisition(&self) -> &SensorAcquisition<P, C, T, D> {
        &self.acquisition
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn display(&self) -> &S {
        &self.display
    }
}
