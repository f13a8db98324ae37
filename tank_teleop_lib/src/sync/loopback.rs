// In-process robot used when no hardware is reachable

use crate::{
    clamp_unit, ArmCommand, BaseCommand, DiffDriveKinematics, ExtensionIk, IntegrationPolicy,
    JointTelemetry, KinematicsConfig, PlanarArmJoints, RobotEndpoint, RobotState,
    StatusTelemetry, TrackSpeeds, DEFAULT_ARM_EXTENSION, DEFAULT_GRIPPER,
};
use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::debug;

/// Top wheel surface speed, m/s. Commands beyond this saturate at 100% duty.
pub const MAX_WHEEL_LINEAR: f64 = 0.5;
/// Half the wheel separation of the physical base, m.
pub const WHEEL_HALF_TRACK: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotorDirection {
    Stop,
    Forward,
    Backward,
}

/// Motor driver setpoint: direction plus duty cycle in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelDrive {
    pub direction: MotorDirection,
    pub duty: u8,
}

impl WheelDrive {
    pub fn stop() -> Self {
        Self {
            direction: MotorDirection::Stop,
            duty: 0,
        }
    }

    /// Map a normalized wheel speed in [-1, 1] to a driver setpoint.
    pub fn from_normalized(norm: f64) -> Self {
        let norm = if norm.is_finite() { norm.clamp(-1.0, 1.0) } else { 0.0 };
        let direction = if norm > 1e-3 {
            MotorDirection::Forward
        } else if norm < -1e-3 {
            MotorDirection::Backward
        } else {
            MotorDirection::Stop
        };
        Self {
            direction,
            duty: (norm.abs() * 100.0).round() as u8,
        }
    }
}

/// Convert a body twist into left/right wheel setpoints.
pub fn wheel_drive(v: f64, omega: f64) -> (WheelDrive, WheelDrive) {
    let speeds = TrackSpeeds {
        left: v - omega * WHEEL_HALF_TRACK,
        right: v + omega * WHEEL_HALF_TRACK,
    };
    (
        WheelDrive::from_normalized(speeds.left / MAX_WHEEL_LINEAR),
        WheelDrive::from_normalized(speeds.right / MAX_WHEEL_LINEAR),
    )
}

#[derive(Debug)]
struct LoopbackModel {
    pose: RobotState,
    emergency: bool,
    left: WheelDrive,
    right: WheelDrive,
    extension: f64,
    gripper: f64,
    turret_deg: f64,
    last_step: Instant,
}

/// A robot that lives inside the console process and answers the same four
/// calls as the hardware.
///
/// Emergency latches and stops both wheels. While latched, moving velocity
/// commands are ignored; only a stop command (zero twist, as the console
/// sends on reset) releases the latch. Pose is integrated from wall-clock
/// time whenever the robot is queried or commanded.
pub struct LoopbackRobot {
    model: Mutex<LoopbackModel>,
    kinematics: DiffDriveKinematics,
    ik: ExtensionIk,
}

impl Default for LoopbackRobot {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackRobot {
    pub fn new() -> Self {
        let config = KinematicsConfig {
            half_track: WHEEL_HALF_TRACK,
            policy: IntegrationPolicy::Translate,
            ..KinematicsConfig::default()
        };

        Self {
            model: Mutex::new(LoopbackModel {
                pose: RobotState::default(),
                emergency: false,
                left: WheelDrive::stop(),
                right: WheelDrive::stop(),
                extension: DEFAULT_ARM_EXTENSION,
                gripper: DEFAULT_GRIPPER,
                turret_deg: 0.0,
                last_step: Instant::now(),
            }),
            kinematics: DiffDriveKinematics::new(&config),
            ik: ExtensionIk::default(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LoopbackModel>> {
        self.model
            .lock()
            .map_err(|_| eyre::eyre!("loopback robot state poisoned"))
    }

    /// Advance the robot's own pose by `dt` seconds.
    pub fn step(&self, dt: f64) -> Result<()> {
        let mut model = self.lock()?;
        self.integrate(&mut model, dt);
        Ok(())
    }

    fn catch_up(&self, model: &mut LoopbackModel) {
        let now = Instant::now();
        let dt = now.duration_since(model.last_step).as_secs_f64();
        model.last_step = now;
        self.integrate(model, dt);
    }

    fn integrate(&self, model: &mut LoopbackModel, dt: f64) {
        if model.emergency {
            model.pose.v_linear_cmd = 0.0;
            model.pose.v_angular_cmd = 0.0;
        }
        self.kinematics.step(&mut model.pose, dt);
    }

    pub fn wheels(&self) -> Result<(WheelDrive, WheelDrive)> {
        let model = self.lock()?;
        Ok((model.left, model.right))
    }

    /// Planar joint angles the arm would be driven to for the current
    /// extension.
    pub fn arm_joints(&self) -> Result<PlanarArmJoints> {
        let model = self.lock()?;
        Ok(self.ik.solve(model.extension))
    }

    pub fn emergency(&self) -> Result<bool> {
        Ok(self.lock()?.emergency)
    }
}

#[async_trait]
impl RobotEndpoint for LoopbackRobot {
    async fn fetch_status(&self) -> Result<StatusTelemetry> {
        let mut model = self.lock()?;
        self.catch_up(&mut model);

        let pose = &model.pose;
        Ok(StatusTelemetry {
            x: Some(pose.x),
            y: Some(pose.y),
            theta_deg: Some(pose.heading.to_degrees()),
            v_linear: Some(pose.v_linear),
            v_angular_deg: Some(pose.v_angular.to_degrees()),
            emergency: Some(model.emergency),
            wifi_ssid: Some("loopback".to_string()),
            wifi_rssi_dbm: Some(-42.0),
            cpu_temp_c: Some(47.5),
            cpu_load_percent: Some(12.0),
            board_temp_c: Some(36.0),
            battery_v: Some(12.3),
            current_total_a: Some(1.4),
            current_5v_a: Some(0.6),
            current_12v_a: Some(0.3),
            current_motors_a: Some(0.5),
            current_gpio_ma: Some(18.0),
        })
    }

    async fn fetch_joints(&self) -> Result<JointTelemetry> {
        let model = self.lock()?;
        Ok(JointTelemetry {
            turret_deg: Some(model.turret_deg),
            arm_ext: Some(model.extension),
            gripper: Some(model.gripper),
        })
    }

    async fn push_base(&self, command: &BaseCommand) -> Result<()> {
        let mut model = self.lock()?;
        self.catch_up(&mut model);

        match *command {
            BaseCommand::Emergency { emergency: true } => {
                model.emergency = true;
                model.pose.v_linear_cmd = 0.0;
                model.pose.v_angular_cmd = 0.0;
                model.left = WheelDrive::stop();
                model.right = WheelDrive::stop();
            }
            BaseCommand::Emergency { emergency: false } => {}
            BaseCommand::Velocity {
                v_linear,
                v_angular,
            } if model.emergency && (v_linear != 0.0 || v_angular != 0.0) => {
                debug!(
                    "Loopback emergency latched, ignoring v={:.2} w={:.2}",
                    v_linear, v_angular
                );
            }
            BaseCommand::Velocity {
                v_linear,
                v_angular,
            } => {
                model.emergency = false;
                model.pose.v_linear_cmd = v_linear;
                model.pose.v_angular_cmd = v_angular;
                let (left, right) = wheel_drive(v_linear, v_angular);
                model.left = left;
                model.right = right;
            }
        }

        debug!(
            "Loopback wheels: left {:?} {}%, right {:?} {}%",
            model.left.direction, model.left.duty, model.right.direction, model.right.duty
        );
        Ok(())
    }

    async fn push_arm(&self, command: &ArmCommand) -> Result<()> {
        let mut model = self.lock()?;
        model.extension = clamp_unit(command.extend);
        model.gripper = clamp_unit(command.gripper);
        if command.turret_angle.is_finite() {
            model.turret_deg = command.turret_angle;
        }

        debug!("Loopback arm joints: {:?}", self.ik.solve(model.extension));
        Ok(())
    }
}
