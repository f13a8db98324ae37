use crate::{
    ArbiterOutcome, ArmCommand, BaseCommand, ConsoleConfig, DiffDriveKinematics, DrainReport,
    GamepadSnapshot, InputArbiter, ManipulatorModel, ModeRouter, NetworkSync, OperatorEvent,
    RobotState,
};
use tracing::{debug, info};

/// Result of one control tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub outcome: ArbiterOutcome,
    pub merged: DrainReport,
    pub pushed_base: Option<BaseCommand>,
    pub pushed_arm: Option<ArmCommand>,
}

/// One control tick, in a fixed order:
///
/// 1. queued telemetry is merged,
/// 2. operator events are applied in arrival order,
/// 3. the gamepad is polled,
/// 4. the pose is integrated (Simulating) or only the treads animate (Live),
/// 5. changed commands are pushed (Live only).
pub struct TeleopLoop {
    arbiter: InputArbiter,
    router: ModeRouter,
    kinematics: DiffDriveKinematics,
    manipulator: ManipulatorModel,
    sync: Option<NetworkSync>,
}

impl TeleopLoop {
    pub fn new(config: &ConsoleConfig) -> Self {
        Self {
            arbiter: InputArbiter::new(&config.gamepad, &config.presets),
            router: ModeRouter::new(
                config.control.start_in_simulation,
                config.network.simulating_telemetry,
            ),
            kinematics: DiffDriveKinematics::new(&config.kinematics),
            manipulator: ManipulatorModel::new(config.manipulator.clone()),
            sync: None,
        }
    }

    pub fn with_sync(mut self, sync: NetworkSync) -> Self {
        self.sync = Some(sync);
        self
    }

    /// A fresh state record matching this loop's configuration.
    pub fn initial_state(config: &ConsoleConfig) -> RobotState {
        RobotState::new(
            config.manipulator.turret_limits(),
            config.control.start_in_simulation,
        )
    }

    pub fn router(&self) -> &ModeRouter {
        &self.router
    }

    pub fn sync(&self) -> Option<&NetworkSync> {
        self.sync.as_ref()
    }

    pub fn sync_mut(&mut self) -> Option<&mut NetworkSync> {
        self.sync.as_mut()
    }

    pub fn manipulator(&self) -> &ManipulatorModel {
        &self.manipulator
    }

    pub fn kinematics(&self) -> &DiffDriveKinematics {
        &self.kinematics
    }

    pub fn tick<I>(
        &mut self,
        state: &mut RobotState,
        events: I,
        pad: Option<&GamepadSnapshot>,
        dt: f64,
    ) -> TickReport
    where
        I: IntoIterator<Item = OperatorEvent>,
    {
        let mut report = TickReport::default();

        if let Some(sync) = self.sync.as_mut() {
            report.merged = sync.drain(state, &self.router);
        }

        for event in events {
            match event {
                OperatorEvent::Control(control) => {
                    self.arbiter.apply_event(state, control, &mut report.outcome);
                }
                OperatorEvent::SetSimulation(simulating) => {
                    self.router.set_simulation(state, simulating);
                }
                OperatorEvent::ToggleSimulation => {
                    self.router.toggle(state);
                }
                OperatorEvent::Reset => {
                    info!("Operator reset");
                    state.reset();
                    self.arbiter.reset();
                    self.router.restart_epoch();
                    report.outcome.base_dirty = true;
                    report.outcome.arm_dirty = true;
                }
            }
        }

        self.arbiter.poll_gamepad(state, pad, dt, &mut report.outcome);

        if self.router.integrates() {
            self.kinematics.step(state, dt);
        } else {
            self.kinematics.animate_tracks(state, dt);
        }

        if self.router.dispatches() {
            if let Some(sync) = self.sync.as_mut() {
                if report.outcome.base_dirty {
                    let command = BaseCommand::from_state(state);
                    sync.push_base(command);
                    report.pushed_base = Some(command);
                }
                if report.outcome.arm_dirty {
                    let command = ArmCommand::from_state(state);
                    sync.push_arm(command);
                    report.pushed_arm = Some(command);
                }
            }
        } else if report.outcome.base_dirty || report.outcome.arm_dirty {
            debug!("Simulating, command dispatch suppressed");
        }

        report
    }
}
