use crate::{RobotState, SimulatingTelemetry};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Local integration drives the pose; no commands leave the console
    Simulating,
    /// Remote telemetry drives the pose; commands are pushed on change
    Live,
}

impl Mode {
    pub fn from_simulation_flag(simulating: bool) -> Self {
        if simulating {
            Mode::Simulating
        } else {
            Mode::Live
        }
    }
}

/// Mode plus the epoch it was entered in. Every switch and every operator
/// reset bumps the epoch, so a request tagged with an older stamp is known
/// to be stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeStamp {
    pub mode: Mode,
    pub epoch: u64,
}

/// Operator-driven Simulating/Live switch.
///
/// There is no automatic fallback: a failing network never changes the
/// mode. The current stamp is published on a watch channel so pollers can
/// tag requests at issue time.
#[derive(Debug)]
pub struct ModeRouter {
    stamp: ModeStamp,
    simulating_telemetry: SimulatingTelemetry,
    publisher: watch::Sender<ModeStamp>,
}

impl ModeRouter {
    pub fn new(simulating: bool, simulating_telemetry: SimulatingTelemetry) -> Self {
        let stamp = ModeStamp {
            mode: Mode::from_simulation_flag(simulating),
            epoch: 0,
        };
        let (publisher, _) = watch::channel(stamp);
        Self {
            stamp,
            simulating_telemetry,
            publisher,
        }
    }

    pub fn mode(&self) -> Mode {
        self.stamp.mode
    }

    pub fn stamp(&self) -> ModeStamp {
        self.stamp
    }

    pub fn subscribe(&self) -> watch::Receiver<ModeStamp> {
        self.publisher.subscribe()
    }

    /// Switch mode and mirror it into `state`. Returns `false` when the
    /// requested mode is already active.
    pub fn set_simulation(&mut self, state: &mut RobotState, simulating: bool) -> bool {
        let mode = Mode::from_simulation_flag(simulating);
        if mode == self.stamp.mode {
            state.set_simulation_mode(simulating);
            return false;
        }

        self.publish(mode);
        state.set_simulation_mode(simulating);

        info!("Mode switched to {:?} (epoch {})", mode, self.stamp.epoch);
        true
    }

    /// Start a new epoch in the current mode. Telemetry requested before
    /// this call is discarded when it arrives.
    pub fn restart_epoch(&mut self) {
        self.publish(self.stamp.mode);
        debug!("Epoch restarted at {}", self.stamp.epoch);
    }

    fn publish(&mut self, mode: Mode) {
        self.stamp = ModeStamp {
            mode,
            epoch: self.stamp.epoch + 1,
        };
        self.publisher.send_replace(self.stamp);
    }

    pub fn toggle(&mut self, state: &mut RobotState) -> Mode {
        let simulating = self.stamp.mode == Mode::Live;
        self.set_simulation(state, simulating);
        self.stamp.mode
    }

    /// Whether telemetry issued under `issued` may be merged now.
    pub fn accepts(&self, issued: ModeStamp) -> bool {
        if issued.epoch != self.stamp.epoch {
            return false;
        }
        match issued.mode {
            Mode::Live => true,
            Mode::Simulating => self.simulating_telemetry == SimulatingTelemetry::Merge,
        }
    }

    /// Local integration advances the pose this tick
    pub fn integrates(&self) -> bool {
        self.stamp.mode == Mode::Simulating
    }

    /// Commands go out to the robot
    pub fn dispatches(&self) -> bool {
        self.stamp.mode == Mode::Live
    }
}
