use serde::{Deserialize, Serialize};

/// Arm extension restored by [`RobotState::reset`].
pub const DEFAULT_ARM_EXTENSION: f64 = 0.5;
/// Gripper closure restored by [`RobotState::reset`] (partially closed).
pub const DEFAULT_GRIPPER: f64 = 0.3;

/// Clamp a fraction to [0, 1]; NaN collapses to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Turret yaw limits in degrees. Every write to the turret angle is clamped here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurretLimits {
    pub min_deg: f64,
    pub max_deg: f64,
}

impl Default for TurretLimits {
    fn default() -> Self {
        Self {
            min_deg: -180.0,
            max_deg: 180.0,
        }
    }
}

impl TurretLimits {
    pub fn clamp(&self, angle_deg: f64) -> f64 {
        if angle_deg.is_nan() {
            return 0.0_f64.clamp(self.min_deg, self.max_deg);
        }
        angle_deg.clamp(self.min_deg, self.max_deg)
    }
}

/// Canonical robot/manipulator record shared by every console component.
///
/// Write contract:
/// - `v_linear_cmd`, `v_angular_cmd`: input arbiter only.
/// - `x`, `y`, `heading`, `v_linear`, `v_angular`, track phases: kinematic
///   integrator (simulating) or telemetry merge (live).
/// - turret / arm / gripper: input arbiter, telemetry merge; always through
///   the clamping setters.
/// - `simulation_mode`: mode router only.
/// - `gamepad_connected`: input arbiter, on device presence changes.
/// - `emergency`: latched by the estop path or remote telemetry, cleared by
///   [`RobotState::reset`].
///
/// Units: metres, seconds, radians for the base; degrees for the turret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotState {
    pub x: f64,
    pub y: f64,
    /// Heading in radians, CCW positive, accumulates without normalization.
    pub heading: f64,

    /// Operator-commanded linear velocity (m/s)
    pub v_linear_cmd: f64,
    /// Operator-commanded angular velocity (rad/s)
    pub v_angular_cmd: f64,

    /// Last integrated or observed linear velocity (m/s)
    pub v_linear: f64,
    /// Last integrated or observed angular velocity (rad/s)
    pub v_angular: f64,

    pub track_phase_left: f64,
    pub track_phase_right: f64,

    turret_angle: f64,
    arm_extension: f64,
    gripper: f64,

    simulation_mode: bool,
    gamepad_connected: bool,
    emergency: bool,

    #[serde(skip)]
    turret_limits: TurretLimits,
}

impl Default for RobotState {
    fn default() -> Self {
        Self::new(TurretLimits::default(), true)
    }
}

impl RobotState {
    pub fn new(turret_limits: TurretLimits, simulation_mode: bool) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            heading: 0.0,
            v_linear_cmd: 0.0,
            v_angular_cmd: 0.0,
            v_linear: 0.0,
            v_angular: 0.0,
            track_phase_left: 0.0,
            track_phase_right: 0.0,
            turret_angle: turret_limits.clamp(0.0),
            arm_extension: DEFAULT_ARM_EXTENSION,
            gripper: DEFAULT_GRIPPER,
            simulation_mode,
            gamepad_connected: false,
            emergency: false,
            turret_limits,
        }
    }

    /// Restore motion and joint fields to their defaults and clear a latched
    /// emergency. Mode and device flags are left alone.
    pub fn reset(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.heading = 0.0;
        self.v_linear_cmd = 0.0;
        self.v_angular_cmd = 0.0;
        self.v_linear = 0.0;
        self.v_angular = 0.0;
        self.track_phase_left = 0.0;
        self.track_phase_right = 0.0;
        self.turret_angle = self.turret_limits.clamp(0.0);
        self.arm_extension = DEFAULT_ARM_EXTENSION;
        self.gripper = DEFAULT_GRIPPER;
        self.emergency = false;
    }

    /// Turret yaw in degrees
    pub fn turret_angle(&self) -> f64 {
        self.turret_angle
    }

    pub fn set_turret_angle(&mut self, angle_deg: f64) {
        self.turret_angle = self.turret_limits.clamp(angle_deg);
    }

    pub fn turret_limits(&self) -> TurretLimits {
        self.turret_limits
    }

    /// Telescopic reach fraction in [0, 1]
    pub fn arm_extension(&self) -> f64 {
        self.arm_extension
    }

    pub fn set_arm_extension(&mut self, extension: f64) {
        self.arm_extension = clamp_unit(extension);
    }

    /// Gripper closure fraction: 1.0 is fully closed, 0.0 fully open.
    pub fn gripper(&self) -> f64 {
        self.gripper
    }

    pub fn set_gripper(&mut self, closure: f64) {
        self.gripper = clamp_unit(closure);
    }

    pub fn simulation_mode(&self) -> bool {
        self.simulation_mode
    }

    pub(crate) fn set_simulation_mode(&mut self, simulating: bool) {
        self.simulation_mode = simulating;
    }

    pub fn gamepad_connected(&self) -> bool {
        self.gamepad_connected
    }

    pub(crate) fn set_gamepad_connected(&mut self, connected: bool) {
        self.gamepad_connected = connected;
    }

    pub fn emergency(&self) -> bool {
        self.emergency
    }

    /// Latch the emergency flag and zero the commanded base velocities.
    pub(crate) fn latch_emergency(&mut self) {
        self.emergency = true;
        self.v_linear_cmd = 0.0;
        self.v_angular_cmd = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_setters_clamp() {
        let mut state = RobotState::default();

        state.set_arm_extension(1.7);
        assert_eq!(state.arm_extension(), 1.0);
        state.set_arm_extension(-0.2);
        assert_eq!(state.arm_extension(), 0.0);

        state.set_gripper(f64::NAN);
        assert_eq!(state.gripper(), 0.0);
        state.set_gripper(0.25);
        assert_eq!(state.gripper(), 0.25);

        state.set_turret_angle(270.0);
        assert_eq!(state.turret_angle(), 180.0);
        state.set_turret_angle(-400.0);
        assert_eq!(state.turret_angle(), -180.0);
    }

    #[test]
    fn test_reset_restores_defaults_but_keeps_mode_flags() {
        let mut state = RobotState::new(TurretLimits::default(), false);
        state.set_gamepad_connected(true);
        state.x = 3.0;
        state.y = -2.0;
        state.heading = 7.5;
        state.v_linear = 0.4;
        state.v_angular = 0.1;
        state.track_phase_left = 120.0;
        state.set_turret_angle(45.0);
        state.set_arm_extension(0.9);
        state.set_gripper(1.0);
        state.latch_emergency();

        state.reset();

        assert_eq!((state.x, state.y, state.heading), (0.0, 0.0, 0.0));
        assert_eq!((state.v_linear, state.v_angular), (0.0, 0.0));
        assert_eq!((state.v_linear_cmd, state.v_angular_cmd), (0.0, 0.0));
        assert_eq!(state.track_phase_left, 0.0);
        assert_eq!(state.turret_angle(), 0.0);
        assert_eq!(state.arm_extension(), DEFAULT_ARM_EXTENSION);
        assert_eq!(state.gripper(), DEFAULT_GRIPPER);
        assert!(!state.emergency());
        assert!(!state.simulation_mode());
        assert!(state.gamepad_connected());
    }

    #[test]
    fn test_emergency_latch_zeroes_commands() {
        let mut state = RobotState::default();
        state.v_linear_cmd = 0.5;
        state.v_angular_cmd = -0.3;

        state.latch_emergency();

        assert!(state.emergency());
        assert_eq!(state.v_linear_cmd, 0.0);
        assert_eq!(state.v_angular_cmd, 0.0);
    }
}
