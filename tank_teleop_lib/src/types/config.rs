use crate::TurretLimits;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Top-level console configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub network: NetworkConfig,
    pub control: ControlConfig,
    pub kinematics: KinematicsConfig,
    pub manipulator: ManipulatorGeometry,
    pub gamepad: GamepadConfig,
    pub presets: PresetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub robot_url: String,
    pub status_period_ms: u64,
    pub joint_period_ms: u64,
    /// Talk to the in-process loopback robot instead of HTTP
    pub loopback: bool,
    pub simulating_telemetry: SimulatingTelemetry,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            robot_url: "http://127.0.0.1:8080".to_string(),
            status_period_ms: 500,
            joint_period_ms: 200,
            loopback: false,
            simulating_telemetry: SimulatingTelemetry::Merge,
        }
    }
}

impl NetworkConfig {
    pub fn status_period(&self) -> Duration {
        Duration::from_millis(self.status_period_ms)
    }

    pub fn joint_period(&self) -> Duration {
        Duration::from_millis(self.joint_period_ms)
    }
}

/// What to do with telemetry that arrives while simulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulatingTelemetry {
    /// Merge it like in live mode (requests issued in another mode are still dropped)
    Merge,
    /// Poll for the display only; never touch pose or joints
    Discard,
}

/// Control tick rates accepted by [`ConsoleConfig::validate`], Hz.
pub const MIN_TICK_HZ: f64 = 0.1;
pub const MAX_TICK_HZ: f64 = 1000.0;
const DEFAULT_TICK_HZ: f64 = 60.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub tick_hz: f64,
    pub dashboard_period_ms: u64,
    pub start_in_simulation: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
            dashboard_period_ms: 1000,
            start_in_simulation: true,
        }
    }
}

impl ControlConfig {
    /// Period of the control tick. Rates outside the accepted range are
    /// clamped into it.
    pub fn tick_period(&self) -> Duration {
        let hz = if self.tick_hz.is_nan() {
            DEFAULT_TICK_HZ
        } else {
            self.tick_hz.clamp(MIN_TICK_HZ, MAX_TICK_HZ)
        };
        Duration::from_secs_f64(1.0 / hz)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicsConfig {
    /// Half of the effective track separation (B)
    pub half_track: f64,
    /// Visual tread phase gain (K)
    pub phase_gain: f64,
    pub policy: IntegrationPolicy,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            half_track: 0.18,
            phase_gain: 60.0,
            policy: IntegrationPolicy::RotateInPlace,
        }
    }
}

/// How the base pose is advanced while simulating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IntegrationPolicy {
    /// Heading changes, x/y stay put (view re-centers on the robot)
    RotateInPlace,
    /// Full position integration, unbounded
    Translate,
    /// Full position integration, wrapping at the viewport edges
    TranslateWrap { width: f64, height: f64 },
}

/// Manipulator link geometry, in the same scene units as the chassis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManipulatorGeometry {
    /// Turret pivot relative to the base center (rear platform center)
    pub turret_offset: [f64; 2],
    /// Boom root relative to the turret pivot, in the turret frame
    pub boom_root: [f64; 2],
    pub fixed_link: f64,
    pub telescope_max: f64,
    pub finger_length: f64,
    /// Finger half-opening at gripper = 0 (radians)
    pub max_open_rad: f64,
    pub turret_min_deg: f64,
    pub turret_max_deg: f64,
}

impl Default for ManipulatorGeometry {
    fn default() -> Self {
        Self {
            turret_offset: [-36.0, 0.0],
            boom_root: [0.0, -8.0],
            fixed_link: 40.0,
            telescope_max: 60.0,
            finger_length: 14.0,
            max_open_rad: 0.6,
            turret_min_deg: -180.0,
            turret_max_deg: 180.0,
        }
    }
}

impl ManipulatorGeometry {
    pub fn turret_limits(&self) -> TurretLimits {
        TurretLimits {
            min_deg: self.turret_min_deg,
            max_deg: self.turret_max_deg,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GamepadConfig {
    pub deadzone: f64,
    /// m/s at full left-stick deflection
    pub linear_scale: f64,
    /// deg/s at full left-stick deflection
    pub angular_scale_deg: f64,
    pub turret_rate_deg: f64,
    pub arm_rate: f64,
    pub gripper_rate: f64,
    pub estop_button: Option<usize>,
    pub disconnect_policy: DisconnectPolicy,
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            deadzone: 0.3,
            linear_scale: 1.0,
            angular_scale_deg: 40.0,
            turret_rate_deg: 25.0,
            arm_rate: 0.25,
            gripper_rate: 0.4,
            estop_button: Some(1),
            disconnect_policy: DisconnectPolicy::Latch,
        }
    }
}

/// Base command handling when the gamepad goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectPolicy {
    /// Keep the last base command until another source overwrites it
    Latch,
    /// Zero the base command
    Stop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetConfig {
    pub forward_speed: f64,
    pub rotate_speed_deg: f64,
    pub turret_step_deg: f64,
    pub arm_step: f64,
    pub gripper_step: f64,
}

impl Default for PresetConfig {
    fn default() -> Self {
        Self {
            forward_speed: 0.5,
            rotate_speed_deg: 30.0,
            turret_step_deg: 5.0,
            arm_step: 0.05,
            gripper_step: 0.1,
        }
    }
}

impl ConsoleConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ConsoleConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.gamepad.deadzone) {
            return Err(eyre::eyre!(
                "Gamepad deadzone {} must be in [0, 1)",
                self.gamepad.deadzone
            ));
        }

        if !(MIN_TICK_HZ..=MAX_TICK_HZ).contains(&self.control.tick_hz) {
            return Err(eyre::eyre!(
                "Control tick rate {} Hz must be in [{}, {}]",
                self.control.tick_hz,
                MIN_TICK_HZ,
                MAX_TICK_HZ
            ));
        }

        if self.network.status_period_ms == 0
            || self.network.joint_period_ms == 0
            || self.control.dashboard_period_ms == 0
        {
            return Err(eyre::eyre!("Polling and dashboard periods must be non-zero"));
        }

        if let IntegrationPolicy::TranslateWrap { width, height } = self.kinematics.policy {
            if width.is_nan() || height.is_nan() || width <= 0.0 || height <= 0.0 {
                return Err(eyre::eyre!(
                    "Wrap viewport {}x{} must have positive dimensions",
                    width,
                    height
                ));
            }
        }

        let geometry = &self.manipulator;
        if geometry.turret_min_deg.is_nan()
            || geometry.turret_max_deg.is_nan()
            || geometry.turret_min_deg > geometry.turret_max_deg
        {
            return Err(eyre::eyre!(
                "Turret limits [{}, {}] are inverted",
                geometry.turret_min_deg,
                geometry.turret_max_deg
            ));
        }

        if geometry.fixed_link < 0.0
            || geometry.telescope_max < 0.0
            || geometry.finger_length < 0.0
        {
            return Err(eyre::eyre!("Manipulator link lengths must be non-negative"));
        }

        Ok(())
    }
}
