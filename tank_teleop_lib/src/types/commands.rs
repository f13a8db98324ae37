use crate::RobotState;
use serde::{Deserialize, Serialize};

/// Base command pushed to `POST /api/base`.
///
/// The two shapes are mutually exclusive on the wire: an emergency stop
/// carries no velocity fields at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BaseCommand {
    /// `{"emergency": true}`
    Emergency { emergency: bool },

    /// `{"vLinear": m/s, "vAngular": rad/s}`
    Velocity {
        #[serde(rename = "vLinear")]
        v_linear: f64,
        #[serde(rename = "vAngular")]
        v_angular: f64,
    },
}

impl BaseCommand {
    pub fn emergency() -> Self {
        Self::Emergency { emergency: true }
    }

    pub fn velocity(v_linear: f64, v_angular: f64) -> Self {
        Self::Velocity {
            v_linear,
            v_angular,
        }
    }

    /// Build the payload for the current committed command. A latched
    /// emergency always wins over the velocity fields.
    pub fn from_state(state: &RobotState) -> Self {
        if state.emergency() {
            Self::emergency()
        } else {
            Self::velocity(state.v_linear_cmd, state.v_angular_cmd)
        }
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::Emergency { emergency: true })
    }
}

/// Manipulator command pushed to `POST /api/arm`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmCommand {
    /// Telescopic extension fraction, 0..1
    pub extend: f64,
    /// Gripper closure fraction, 0..1 (1 = closed)
    pub gripper: f64,
    /// Turret yaw in degrees
    #[serde(rename = "turretAngle")]
    pub turret_angle: f64,
}

impl ArmCommand {
    pub fn from_state(state: &RobotState) -> Self {
        Self {
            extend: state.arm_extension(),
            gripper: state.gripper(),
            turret_angle: state.turret_angle(),
        }
    }
}

/// Reply body for both command endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CommandReply {
    pub fn ok() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_velocity_payload_shape() {
        let value = serde_json::to_value(BaseCommand::velocity(0.5, -0.25)).unwrap();
        assert_eq!(value, json!({"vLinear": 0.5, "vAngular": -0.25}));
    }

    #[test]
    fn test_emergency_payload_has_no_velocity_fields() {
        let value = serde_json::to_value(BaseCommand::emergency()).unwrap();
        assert_eq!(value, json!({"emergency": true}));
        assert!(value.get("vLinear").is_none());
        assert!(value.get("vAngular").is_none());
    }

    #[test]
    fn test_from_state_prefers_emergency() {
        let mut state = RobotState::default();
        state.v_linear_cmd = 0.5;
        assert_eq!(BaseCommand::from_state(&state), BaseCommand::velocity(0.5, 0.0));

        state.latch_emergency();
        let cmd = BaseCommand::from_state(&state);
        assert!(cmd.is_emergency());
    }

    #[test]
    fn test_arm_payload_shape() {
        let mut state = RobotState::default();
        state.set_turret_angle(15.0);
        state.set_arm_extension(0.75);
        state.set_gripper(1.0);

        let value = serde_json::to_value(ArmCommand::from_state(&state)).unwrap();
        assert_eq!(value, json!({"extend": 0.75, "gripper": 1.0, "turretAngle": 15.0}));
    }

    #[test]
    fn test_base_command_parses_both_shapes() {
        let cmd: BaseCommand = serde_json::from_str(r#"{"emergency":true}"#).unwrap();
        assert!(cmd.is_emergency());

        let cmd: BaseCommand = serde_json::from_str(r#"{"vLinear":0.3,"vAngular":0.7}"#).unwrap();
        assert_eq!(cmd, BaseCommand::velocity(0.3, 0.7));
    }
}
