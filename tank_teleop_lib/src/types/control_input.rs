use serde::{Deserialize, Serialize};

/// Continuous operator controls. Each slider reports in its own display
/// unit; the arbiter converts to the canonical state unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SliderAxis {
    /// m/s
    LinearVelocity,
    /// deg/s
    AngularVelocityDeg,
    /// degrees
    TurretDeg,
    /// percent, 0..100
    ArmPercent,
    /// percent, 0..100
    GripperPercent,
}

/// Discrete operator buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscreteControl {
    Forward,
    Back,
    RotateLeft,
    RotateRight,
    EmergencyStop,
    TurretLeft,
    TurretRight,
    ArmExtend,
    ArmRetract,
    GripperClose,
    GripperOpen,
}

/// One input event consumed by the arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlEvent {
    Slider { axis: SliderAxis, value: f64 },
    Button(DiscreteControl),
    GamepadConnected,
    GamepadDisconnected,
}

/// Operator-level events handled by the teleop loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OperatorEvent {
    Control(ControlEvent),
    SetSimulation(bool),
    ToggleSimulation,
    Reset,
}

impl From<ControlEvent> for OperatorEvent {
    fn from(event: ControlEvent) -> Self {
        Self::Control(event)
    }
}

/// Standard-mapping axis and button indices.
pub mod pad {
    pub const LEFT_X: usize = 0;
    pub const LEFT_Y: usize = 1;
    pub const RIGHT_X: usize = 2;
    pub const RIGHT_Y: usize = 3;
    pub const LEFT_TRIGGER: usize = 6;
    pub const RIGHT_TRIGGER: usize = 7;
}

/// Raw gamepad state for one poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GamepadSnapshot {
    /// Stick axes in [-1, 1]; stick-down / stick-right positive
    pub axes: Vec<f64>,
    /// Analog button values in [0, 1]
    pub buttons: Vec<f64>,
}

impl GamepadSnapshot {
    /// Axis value, or 0 when missing or not finite. Clamped to [-1, 1].
    pub fn axis(&self, index: usize) -> f64 {
        match self.axes.get(index) {
            Some(v) if v.is_finite() => v.clamp(-1.0, 1.0),
            _ => 0.0,
        }
    }

    /// Button value, or 0 when missing or not finite. Clamped to [0, 1].
    pub fn button(&self, index: usize) -> f64 {
        match self.buttons.get(index) {
            Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    pub fn pressed(&self, index: usize) -> bool {
        self.button(index) > 0.5
    }
}

/// Polled analog device. `None` means no device is present.
pub trait GamepadSource {
    fn poll(&mut self) -> Option<GamepadSnapshot>;
}
