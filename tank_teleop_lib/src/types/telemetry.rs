use crate::RobotState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of `GET /api/status`. Every field is optional: a partial payload
/// only touches the fields it carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusTelemetry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_linear: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_angular_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency: Option<bool>,

    // Board readings, passed through to the display untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_ssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_rssi_dbm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_temp_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_load_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_temp_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_v: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_total_a: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_5v_a: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_12v_a: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_motors_a: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_gpio_ma: Option<f64>,
}

impl StatusTelemetry {
    /// Merge the motion and emergency fields into `state`.
    ///
    /// Only present fields are written. Angles arrive in degrees and are
    /// stored in radians. A remote `emergency: true` latches the local flag;
    /// `false` never clears it. Returns the number of fields written.
    pub fn merge_into(&self, state: &mut RobotState) -> usize {
        let mut applied = 0;

        if let Some(x) = self.x.filter(|v| v.is_finite()) {
            state.x = x;
            applied += 1;
        }
        if let Some(y) = self.y.filter(|v| v.is_finite()) {
            state.y = y;
            applied += 1;
        }
        if let Some(theta) = self.theta_deg.filter(|v| v.is_finite()) {
            state.heading = theta.to_radians();
            applied += 1;
        }
        if let Some(v) = self.v_linear.filter(|v| v.is_finite()) {
            state.v_linear = v;
            applied += 1;
        }
        if let Some(w) = self.v_angular_deg.filter(|v| v.is_finite()) {
            state.v_angular = w.to_radians();
            applied += 1;
        }
        if self.emergency == Some(true) && !state.emergency() {
            state.latch_emergency();
            applied += 1;
        }

        applied
    }

    /// Extract the board readings, if the payload carried any.
    pub fn diagnostics(&self, received_at: DateTime<Utc>) -> Option<Diagnostics> {
        let diagnostics = Diagnostics {
            wifi_ssid: self.wifi_ssid.clone(),
            wifi_rssi_dbm: self.wifi_rssi_dbm,
            cpu_temp_c: self.cpu_temp_c,
            cpu_load_percent: self.cpu_load_percent,
            board_temp_c: self.board_temp_c,
            battery_v: self.battery_v,
            current_total_a: self.current_total_a,
            current_5v_a: self.current_5v_a,
            current_12v_a: self.current_12v_a,
            current_motors_a: self.current_motors_a,
            current_gpio_ma: self.current_gpio_ma,
            received_at,
        };

        if diagnostics.is_empty() {
            None
        } else {
            Some(diagnostics)
        }
    }
}

/// Response of `GET /api/joint_state`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointTelemetry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turret_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arm_ext: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gripper: Option<f64>,
}

impl JointTelemetry {
    /// Merge present joint fields through the clamping setters.
    pub fn merge_into(&self, state: &mut RobotState) -> usize {
        let mut applied = 0;

        if let Some(turret) = self.turret_deg.filter(|v| v.is_finite()) {
            state.set_turret_angle(turret);
            applied += 1;
        }
        if let Some(ext) = self.arm_ext.filter(|v| v.is_finite()) {
            state.set_arm_extension(ext);
            applied += 1;
        }
        if let Some(grip) = self.gripper.filter(|v| v.is_finite()) {
            state.set_gripper(grip);
            applied += 1;
        }

        applied
    }
}

/// Board readings from the last status poll, for display collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub wifi_ssid: Option<String>,
    pub wifi_rssi_dbm: Option<f64>,
    pub cpu_temp_c: Option<f64>,
    pub cpu_load_percent: Option<f64>,
    pub board_temp_c: Option<f64>,
    pub battery_v: Option<f64>,
    pub current_total_a: Option<f64>,
    pub current_5v_a: Option<f64>,
    pub current_12v_a: Option<f64>,
    pub current_motors_a: Option<f64>,
    pub current_gpio_ma: Option<f64>,
    pub received_at: DateTime<Utc>,
}

impl Diagnostics {
    fn is_empty(&self) -> bool {
        self.wifi_ssid.is_none()
            && self.wifi_rssi_dbm.is_none()
            && self.cpu_temp_c.is_none()
            && self.cpu_load_percent.is_none()
            && self.board_temp_c.is_none()
            && self.battery_v.is_none()
            && self.current_total_a.is_none()
            && self.current_5v_a.is_none()
            && self.current_12v_a.is_none()
            && self.current_motors_a.is_none()
            && self.current_gpio_ma.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArmCommand, BaseCommand};

    const EPS: f64 = 1e-9;

    fn populated_state() -> RobotState {
        let mut state = RobotState::default();
        state.x = 1.0;
        state.y = 2.0;
        state.heading = 0.3;
        state.v_linear = 0.2;
        state.v_angular = 0.1;
        state.set_turret_angle(20.0);
        state.set_arm_extension(0.8);
        state.set_gripper(0.6);
        state
    }

    #[test]
    fn test_empty_status_is_noop() {
        let mut state = populated_state();
        let before = serde_json::to_value(&state).unwrap();

        let telemetry: StatusTelemetry = serde_json::from_str("{}").unwrap();
        assert_eq!(telemetry.merge_into(&mut state), 0);
        let joints: JointTelemetry = serde_json::from_str("{}").unwrap();
        assert_eq!(joints.merge_into(&mut state), 0);

        assert_eq!(serde_json::to_value(&state).unwrap(), before);
    }

    #[test]
    fn test_partial_status_only_touches_present_fields() {
        let mut state = populated_state();

        let telemetry: StatusTelemetry = serde_json::from_str(r#"{"x": 5}"#).unwrap();
        assert_eq!(telemetry.merge_into(&mut state), 1);

        assert_eq!(state.x, 5.0);
        assert_eq!(state.y, 2.0);
        assert_eq!(state.heading, 0.3);
        assert_eq!(state.turret_angle(), 20.0);
        assert_eq!(state.arm_extension(), 0.8);
        assert_eq!(state.gripper(), 0.6);
    }

    #[test]
    fn test_status_converts_degrees() {
        let mut state = RobotState::default();
        let telemetry: StatusTelemetry =
            serde_json::from_str(r#"{"theta_deg": 90.0, "v_angular_deg": -45.0}"#).unwrap();
        telemetry.merge_into(&mut state);

        assert!((state.heading - std::f64::consts::FRAC_PI_2).abs() < EPS);
        assert!((state.v_angular + std::f64::consts::FRAC_PI_4).abs() < EPS);
    }

    #[test]
    fn test_remote_emergency_latches_but_never_clears() {
        let mut state = RobotState::default();
        state.v_linear_cmd = 0.4;

        let clear: StatusTelemetry = serde_json::from_str(r#"{"emergency": false}"#).unwrap();
        assert_eq!(clear.merge_into(&mut state), 0);
        assert!(!state.emergency());

        let latch: StatusTelemetry = serde_json::from_str(r#"{"emergency": true}"#).unwrap();
        latch.merge_into(&mut state);
        assert!(state.emergency());
        assert_eq!(state.v_linear_cmd, 0.0);

        clear.merge_into(&mut state);
        assert!(state.emergency());
    }

    #[test]
    fn test_joint_merge_clamps() {
        let mut state = RobotState::default();
        let joints: JointTelemetry =
            serde_json::from_str(r#"{"arm_ext": 1.4, "gripper": -0.5}"#).unwrap();
        assert_eq!(joints.merge_into(&mut state), 2);
        assert_eq!(state.arm_extension(), 1.0);
        assert_eq!(state.gripper(), 0.0);
    }

    #[test]
    fn test_command_round_trip_through_merge() {
        let mut source = RobotState::default();
        source.v_linear_cmd = 0.35;
        source.v_angular_cmd = -0.6;
        source.set_turret_angle(-42.0);
        source.set_arm_extension(0.15);
        source.set_gripper(0.9);

        let base = serde_json::to_value(BaseCommand::from_state(&source)).unwrap();
        let arm = serde_json::to_value(ArmCommand::from_state(&source)).unwrap();

        // Echo the pushed values back under the telemetry field names.
        let status = StatusTelemetry {
            v_linear: base["vLinear"].as_f64(),
            v_angular_deg: base["vAngular"].as_f64().map(f64::to_degrees),
            ..Default::default()
        };
        let joints = JointTelemetry {
            turret_deg: arm["turretAngle"].as_f64(),
            arm_ext: arm["extend"].as_f64(),
            gripper: arm["gripper"].as_f64(),
        };

        let mut echoed = RobotState::default();
        status.merge_into(&mut echoed);
        joints.merge_into(&mut echoed);

        assert!((echoed.v_linear - source.v_linear_cmd).abs() < EPS);
        assert!((echoed.v_angular - source.v_angular_cmd).abs() < EPS);
        assert!((echoed.turret_angle() - source.turret_angle()).abs() < EPS);
        assert!((echoed.arm_extension() - source.arm_extension()).abs() < EPS);
        assert!((echoed.gripper() - source.gripper()).abs() < EPS);
    }

    #[test]
    fn test_diagnostics_pass_through() {
        let telemetry: StatusTelemetry = serde_json::from_str(
            r#"{"x": 1.0, "battery_v": 12.1, "wifi_ssid": "rover-ap", "current_gpio_ma": 35.0}"#,
        )
        .unwrap();
        let now = Utc::now();
        let diagnostics = telemetry.diagnostics(now).unwrap();
        assert_eq!(diagnostics.battery_v, Some(12.1));
        assert_eq!(diagnostics.wifi_ssid.as_deref(), Some("rover-ap"));
        assert_eq!(diagnostics.current_gpio_ma, Some(35.0));
        assert_eq!(diagnostics.received_at, now);

        let motion_only: StatusTelemetry = serde_json::from_str(r#"{"x": 1.0}"#).unwrap();
        assert!(motion_only.diagnostics(now).is_none());
    }
}
