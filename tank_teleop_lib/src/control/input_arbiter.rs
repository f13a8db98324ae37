use crate::{
    pad, sanitize_dt, ControlEvent, DiscreteControl, DisconnectPolicy, GamepadConfig,
    GamepadSnapshot, PresetConfig, RobotState, SliderAxis,
};
use tracing::{debug, info};

/// Force values at or below `deadzone` to exactly zero.
///
/// Non-finite input reads as zero; everything else is clamped to [-1, 1].
pub fn apply_deadzone(value: f64, deadzone: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let value = value.clamp(-1.0, 1.0);
    if value.abs() > deadzone {
        value
    } else {
        0.0
    }
}

fn trigger_value(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// What one tick of arbitration changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArbiterOutcome {
    /// Base command changed and should be pushed
    pub base_dirty: bool,
    /// Manipulator command changed and should be pushed
    pub arm_dirty: bool,
    /// Emergency stop was triggered this tick
    pub estop: bool,
}

impl ArbiterOutcome {
    pub fn any(&self) -> bool {
        self.base_dirty || self.arm_dirty || self.estop
    }
}

/// Resolves sliders, discrete buttons and the polled gamepad into the
/// committed command fields of [`RobotState`].
///
/// Last writer wins: events are applied in arrival order, then the gamepad
/// (if present) overwrites the base axes. Base teleop from the pad is
/// direct-drive; manipulator teleop is rate control integrated over `dt`.
#[derive(Debug, Clone)]
pub struct InputArbiter {
    gamepad: GamepadConfig,
    presets: PresetConfig,
    estop_held: bool,
}

impl InputArbiter {
    pub fn new(gamepad: &GamepadConfig, presets: &PresetConfig) -> Self {
        Self {
            gamepad: gamepad.clone(),
            presets: presets.clone(),
            estop_held: false,
        }
    }

    pub fn gamepad_config(&self) -> &GamepadConfig {
        &self.gamepad
    }

    /// Apply one slider, button or device event.
    pub fn apply_event(
        &mut self,
        state: &mut RobotState,
        event: ControlEvent,
        outcome: &mut ArbiterOutcome,
    ) {
        match event {
            ControlEvent::Slider { axis, value } => self.apply_slider(state, axis, value, outcome),
            ControlEvent::Button(control) => self.apply_button(state, control, outcome),
            ControlEvent::GamepadConnected => self.connect(state),
            ControlEvent::GamepadDisconnected => self.disconnect(state, outcome),
        }
    }

    fn apply_slider(
        &mut self,
        state: &mut RobotState,
        axis: SliderAxis,
        value: f64,
        outcome: &mut ArbiterOutcome,
    ) {
        let value = if value.is_finite() { value } else { 0.0 };

        match axis {
            SliderAxis::LinearVelocity => {
                let omega = state.v_angular_cmd;
                self.set_base(state, value, omega, outcome);
            }
            SliderAxis::AngularVelocityDeg => {
                let v = state.v_linear_cmd;
                self.set_base(state, v, value.to_radians(), outcome);
            }
            SliderAxis::TurretDeg => {
                state.set_turret_angle(value);
                outcome.arm_dirty = true;
            }
            SliderAxis::ArmPercent => {
                state.set_arm_extension(value / 100.0);
                outcome.arm_dirty = true;
            }
            SliderAxis::GripperPercent => {
                state.set_gripper(value / 100.0);
                outcome.arm_dirty = true;
            }
        }
    }

    fn apply_button(
        &mut self,
        state: &mut RobotState,
        control: DiscreteControl,
        outcome: &mut ArbiterOutcome,
    ) {
        let p = &self.presets;
        let rotate = p.rotate_speed_deg.to_radians();

        match control {
            DiscreteControl::Forward => self.set_base(state, p.forward_speed, 0.0, outcome),
            DiscreteControl::Back => self.set_base(state, -p.forward_speed, 0.0, outcome),
            DiscreteControl::RotateLeft => self.set_base(state, 0.0, rotate, outcome),
            DiscreteControl::RotateRight => self.set_base(state, 0.0, -rotate, outcome),
            DiscreteControl::EmergencyStop => self.trigger_estop(state, outcome),
            DiscreteControl::TurretLeft => {
                state.set_turret_angle(state.turret_angle() + p.turret_step_deg);
                outcome.arm_dirty = true;
            }
            DiscreteControl::TurretRight => {
                state.set_turret_angle(state.turret_angle() - p.turret_step_deg);
                outcome.arm_dirty = true;
            }
            DiscreteControl::ArmExtend => {
                state.set_arm_extension(state.arm_extension() + p.arm_step);
                outcome.arm_dirty = true;
            }
            DiscreteControl::ArmRetract => {
                state.set_arm_extension(state.arm_extension() - p.arm_step);
                outcome.arm_dirty = true;
            }
            DiscreteControl::GripperClose => {
                state.set_gripper(state.gripper() + p.gripper_step);
                outcome.arm_dirty = true;
            }
            DiscreteControl::GripperOpen => {
                state.set_gripper(state.gripper() - p.gripper_step);
                outcome.arm_dirty = true;
            }
        }
    }

    /// Commit a base command. Ignored while the emergency latch is set.
    fn set_base(&self, state: &mut RobotState, v: f64, omega: f64, outcome: &mut ArbiterOutcome) {
        if state.emergency() {
            debug!("Emergency latched, ignoring base command v={:.2} w={:.2}", v, omega);
            return;
        }
        state.v_linear_cmd = v;
        state.v_angular_cmd = omega;
        outcome.base_dirty = true;
    }

    fn trigger_estop(&self, state: &mut RobotState, outcome: &mut ArbiterOutcome) {
        info!("EMERGENCY STOP");
        state.latch_emergency();
        outcome.estop = true;
        outcome.base_dirty = true;
    }

    fn connect(&mut self, state: &mut RobotState) {
        if !state.gamepad_connected() {
            info!("Gamepad connected");
        }
        state.set_gamepad_connected(true);
    }

    fn disconnect(&mut self, state: &mut RobotState, outcome: &mut ArbiterOutcome) {
        if !state.gamepad_connected() {
            return;
        }
        state.set_gamepad_connected(false);
        self.estop_held = false;

        match self.gamepad.disconnect_policy {
            DisconnectPolicy::Latch => {
                info!(
                    "Gamepad disconnected, base command stays at v={:.2} w={:.2}",
                    state.v_linear_cmd, state.v_angular_cmd
                );
            }
            DisconnectPolicy::Stop => {
                info!("Gamepad disconnected, stopping base");
                self.set_base(state, 0.0, 0.0, outcome);
            }
        }
    }

    /// Poll the gamepad once for this tick.
    ///
    /// `None` means no device is present; a previously connected pad is
    /// treated as disconnected. A present pad writes the base command every
    /// tick, even when its sticks rest inside the deadzone.
    pub fn poll_gamepad(
        &mut self,
        state: &mut RobotState,
        pad: Option<&GamepadSnapshot>,
        dt: f64,
        outcome: &mut ArbiterOutcome,
    ) {
        let Some(pad) = pad else {
            self.disconnect(state, outcome);
            return;
        };
        self.connect(state);

        let cfg = &self.gamepad;
        let dz = cfg.deadzone;

        if let Some(button) = cfg.estop_button {
            let pressed = pad.pressed(button);
            if pressed && !self.estop_held {
                self.trigger_estop(state, outcome);
            }
            self.estop_held = pressed;
        }

        // Stick up is negative; stick right turns clockwise
        let lx = apply_deadzone(pad.axis(pad::LEFT_X), dz);
        let ly = apply_deadzone(pad.axis(pad::LEFT_Y), dz);
        let v = -ly * cfg.linear_scale;
        let omega = (-lx * cfg.angular_scale_deg).to_radians();

        if !state.emergency() && (v != state.v_linear_cmd || omega != state.v_angular_cmd) {
            state.v_linear_cmd = v;
            state.v_angular_cmd = omega;
            outcome.base_dirty = true;
        }

        let dt = sanitize_dt(dt);
        let rx = apply_deadzone(pad.axis(pad::RIGHT_X), dz);
        let ry = apply_deadzone(pad.axis(pad::RIGHT_Y), dz);
        // Triggers rest at exactly zero, so they bypass the stick deadzone
        let lt = trigger_value(pad.button(pad::LEFT_TRIGGER));
        let rt = trigger_value(pad.button(pad::RIGHT_TRIGGER));

        let before = (state.turret_angle(), state.arm_extension(), state.gripper());
        state.set_turret_angle(before.0 + rx * cfg.turret_rate_deg * dt);
        state.set_arm_extension(before.1 - ry * cfg.arm_rate * dt);
        state.set_gripper(before.2 + (rt - lt) * cfg.gripper_rate * dt);

        if (state.turret_angle(), state.arm_extension(), state.gripper()) != before {
            outcome.arm_dirty = true;
        }
    }

    /// Forget edge state after an operator reset.
    pub fn reset(&mut self) {
        self.estop_held = false;
    }
}
