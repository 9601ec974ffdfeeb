//! Particulate sensor duty cycle
//!
//! The laser in the particulate sensor wears out, so it only runs for a
//! sample window out of every period:
//!
//! ```text
//!   WakeParticulate (every period)       SleepParticulate (on_for later)
//!            |                                       |
//!   Awake ---+--- warm up + sample ------------------+--> read > 0 ? Asleep : Awake
//! ```
//!
//! Every period trigger forces the sensor awake, whatever state it is in. If
//! the sample window never produces a positive reading the sensor therefore
//! never sleeps; the controller counts such windows so it shows up in the log.

use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};

use crate::config::Timing;
use crate::node::NodeTask;
use crate::scheduler::{Scheduler, TaskHandle};
use crate::sensors::{ClimateSensor, Co2Sensor, ParticulateSensor, SensorAcquisition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerCycleState {
    #[default]
    Awake,
    Asleep,
}

#[derive(Debug, Clone)]
pub struct PowerCycleController {
    state: PowerCycleState,
    on_for_ms: u64,
    period_ms: u64,
    /// Consecutive sample windows that ended without a positive reading
    unready_windows: u32,
    period_task: Option<TaskHandle>,
}

impl PowerCycleController {
    pub fn new(timing: &Timing) -> Self {
        if timing.pm_on_for_ms >= timing.pm_period_ms {
            warn!(
                "Particulate on-time {} ms is not shorter than its period {} ms",
                timing.pm_on_for_ms, timing.pm_period_ms
            );
        }

        Self {
            state: PowerCycleState::Awake,
            on_for_ms: timing.pm_on_for_ms,
            period_ms: timing.pm_period_ms,
            unready_windows: 0,
            period_task: None,
        }
    }

    pub fn state(&self) -> PowerCycleState {
        self.state
    }

    pub fn unready_windows(&self) -> u32 {
        self.unready_windows
    }

    /// Handle of the recurring wake task, once [`Self::start`] has run
    pub fn period_task(&self) -> Option<TaskHandle> {
        self.period_task
    }

    /// Wake the sensor now and register the recurring wake trigger
    pub async fn start<P, C, T, D>(
        &mut self,
        acquisition: &mut SensorAcquisition<P, C, T, D>,
        scheduler: &mut Scheduler<NodeTask>,
    ) where
        P: ParticulateSensor,
        C: Co2Sensor,
        T: ClimateSensor,
        D: DelayNs,
    {
        self.wake(acquisition, scheduler).await;
        let period_task = scheduler.schedule_repeating(self.period_ms, NodeTask::WakeParticulate);
        self.period_task = Some(period_task);
        info!(
            "Particulate duty cycle started: {} ms on every {} ms",
            self.on_for_ms, self.period_ms
        );
    }

    /// Force the sensor awake and arm the end of the sample window
    pub async fn wake<P, C, T, D>(
        &mut self,
        acquisition: &mut SensorAcquisition<P, C, T, D>,
        scheduler: &mut Scheduler<NodeTask>,
    ) where
        P: ParticulateSensor,
        C: Co2Sensor,
        T: ClimateSensor,
        D: DelayNs,
    {
        self.state = PowerCycleState::Awake;

        match acquisition.wake_particulate().await {
            Ok(()) => info!("Particulate sensor awake"),
            Err(e) => error!("Particulate wake command failed: {}", e),
        }

        scheduler.schedule_once(self.on_for_ms, NodeTask::SleepParticulate);
    }

    /// Sample once and put the sensor to sleep if the reading is usable
    pub async fn end_sample_window<P, C, T, D>(
        &mut self,
        acquisition: &mut SensorAcquisition<P, C, T, D>,
    ) where
        P: ParticulateSensor,
        C: Co2Sensor,
        T: ClimateSensor,
        D: DelayNs,
    {
        let raw = acquisition.refresh_pm25().await;

        if raw <= 0 {
            self.unready_windows = self.unready_windows.saturating_add(1);
            warn!(
                "Particulate sensor not ready (read {}), staying awake; {} window(s) in a row",
                raw, self.unready_windows
            );
            return;
        }

        self.unready_windows = 0;

        match acquisition.sleep_particulate().await {
            Ok(()) => {
                self.state = PowerCycleState::Asleep;
                info!("Particulate sensor asleep");
            }
            Err(e) => error!("Particulate sleep command failed, staying awake: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Capabilities;
    use crate::sensors::testing::{CountingDelay, ScriptedClimate, ScriptedCo2, ScriptedParticulate};
    use embassy_futures::block_on;

    type TestAcquisition =
        SensorAcquisition<ScriptedParticulate, ScriptedCo2, ScriptedClimate, CountingDelay>;

    fn acquisition(particulate: ScriptedParticulate) -> TestAcquisition {
        SensorAcquisition::new(
            particulate,
            ScriptedCo2::new(&[]),
            ScriptedClimate::constant(20.0, 40.0),
            CountingDelay::default(),
            Capabilities::all(),
        )
    }

    #[test]
    fn test_start_wakes_and_arms_both_tasks() {
        let mut controller = PowerCycleController::new(&Timing::default());
        let mut acq = acquisition(ScriptedParticulate::new(&[]));
        let mut scheduler = Scheduler::new(0);

        block_on(controller.start(&mut acq, &mut scheduler));

        assert_eq!(controller.state(), PowerCycleState::Awake);
        assert_eq!(acq.particulate().wakes(), 1);
        assert_eq!(scheduler.len(), 2);
        assert_eq!(scheduler.next_deadline(), Some(30_000));
        let period = controller.period_task().unwrap();
        assert_eq!(scheduler.due_time(period), Some(120_000));
    }

    #[test]
    fn test_positive_read_goes_to_sleep() {
        let mut controller = PowerCycleController::new(&Timing::default());
        let mut acq = acquisition(ScriptedParticulate::new(&[8]));

        block_on(controller.end_sample_window(&mut acq));

        assert_eq!(controller.state(), PowerCycleState::Asleep);
        assert_eq!(acq.particulate().sleeps(), 1);
        assert_eq!(acq.last_pm25(), Some(8));
    }

    #[test]
    fn test_non_positive_read_stays_awake() {
        let mut controller = PowerCycleController::new(&Timing::default());
        let mut acq = acquisition(ScriptedParticulate::new(&[0, -1]));

        block_on(controller.end_sample_window(&mut acq));
        block_on(controller.end_sample_window(&mut acq));

        assert_eq!(controller.state(), PowerCycleState::Awake);
        assert_eq!(controller.unready_windows(), 2);
        assert_eq!(acq.particulate().sleeps(), 0);
        assert_eq!(acq.last_pm25(), None);
    }

    #[test]
    fn test_unready_count_resets_after_good_window() {
        let mut controller = PowerCycleController::new(&Timing::default());
        let mut acq = acquisition(ScriptedParticulate::new(&[0, 5]));

        block_on(controller.end_sample_window(&mut acq));
        assert_eq!(controller.unready_windows(), 1);

        block_on(controller.end_sample_window(&mut acq));
        assert_eq!(controller.unready_windows(), 0);
        assert_eq!(controller.state(), PowerCycleState::Asleep);
    }

    #[test]
    fn test_failed_sleep_command_stays_awake() {
        let mut controller = PowerCycleController::new(&Timing::default());
        let mut acq = acquisition(ScriptedParticulate::new(&[8]).failing_sleep());

        block_on(controller.end_sample_window(&mut acq));

        assert_eq!(controller.state(), PowerCycleState::Awake);
        // The reading itself is still kept
        assert_eq!(acq.last_pm25(), Some(8));
    }

    #[test]
    fn test_wake_forces_awake_from_asleep() {
        let mut controller = PowerCycleController::new(&Timing::default());
        let mut acq = acquisition(ScriptedParticulate::new(&[8]));
        let mut scheduler = Scheduler::new(0);

        block_on(controller.end_sample_window(&mut acq));
        assert_eq!(controller.state(), PowerCycleState::Asleep);

        block_on(controller.wake(&mut acq, &mut scheduler));
        assert_eq!(controller.state(), PowerCycleState::Awake);
        assert_eq!(scheduler.tick(30_000), [NodeTask::SleepParticulate]);
    }

    #[test]
    fn test_wake_failure_still_arms_window() {
        let mut controller = PowerCycleController::new(&Timing::default());
        let mut acq = SensorAcquisition::new(
            ScriptedParticulate::new(&[]),
            ScriptedCo2::new(&[]),
            ScriptedClimate::constant(20.0, 40.0),
            CountingDelay::default(),
            Capabilities {
                particulate: false,
                ..Capabilities::all()
            },
        );
        let mut scheduler = Scheduler::new(0);

        block_on(controller.wake(&mut acq, &mut scheduler));

        assert_eq!(controller.state(), PowerCycleState::Awake);
        assert_eq!(acq.particulate().wakes(), 0);
        assert_eq!(scheduler.len(), 1);
    }
}
