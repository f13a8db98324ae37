// Differential (tracked) drive kinematics and pose integration

use crate::{IntegrationPolicy, KinematicsConfig, RobotState};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Planar body twist (v, ω) in the base frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyTwist {
    pub v: f64,     // Linear velocity along the heading (m/s)
    pub omega: f64, // Angular velocity about z (rad/s)
}

impl BodyTwist {
    pub fn new(v: f64, omega: f64) -> Self {
        Self { v, omega }
    }

    pub fn zero() -> Self {
        Self { v: 0.0, omega: 0.0 }
    }
}

/// Left/right track surface speeds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSpeeds {
    pub left: f64,
    pub right: f64,
}

/// Treat negative, NaN and infinite time steps as zero.
pub fn sanitize_dt(dt: f64) -> f64 {
    if dt.is_finite() && dt > 0.0 {
        dt
    } else {
        0.0
    }
}

/// Reduce an unbounded tread phase to an offset within one segment.
pub fn tread_offset(phase: f64, segment: f64) -> f64 {
    if segment.is_nan() || segment <= 0.0 || !phase.is_finite() {
        return 0.0;
    }
    phase.rem_euclid(segment)
}

/// Differential drive model:
///
/// vL = v - ω·B, vR = v + ω·B
///
/// where B is half the effective track separation. Pose integration
/// applies the heading update first, then advances x/y along the new
/// heading (policy permitting).
#[derive(Debug, Clone)]
pub struct DiffDriveKinematics {
    half_track: f64,
    phase_gain: f64,
    policy: IntegrationPolicy,
}

impl DiffDriveKinematics {
    pub fn new(config: &KinematicsConfig) -> Self {
        Self {
            half_track: config.half_track,
            phase_gain: config.phase_gain,
            policy: config.policy,
        }
    }

    pub fn with_policy(mut self, policy: IntegrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> IntegrationPolicy {
        self.policy
    }

    pub fn half_track(&self) -> f64 {
        self.half_track
    }

    /// Convert a body twist into left/right track speeds
    pub fn body_twist_to_track_speeds(&self, twist: &BodyTwist) -> TrackSpeeds {
        TrackSpeeds {
            left: twist.v - twist.omega * self.half_track,
            right: twist.v + twist.omega * self.half_track,
        }
    }

    /// Recover the body twist from left/right track speeds
    pub fn track_speeds_to_body_twist(&self, speeds: &TrackSpeeds) -> BodyTwist {
        let v = (speeds.left + speeds.right) * 0.5;
        let omega = if self.half_track.abs() > f64::EPSILON {
            (speeds.right - speeds.left) / (2.0 * self.half_track)
        } else {
            0.0
        };
        BodyTwist::new(v, omega)
    }

    /// Advance pose, velocities and tread phases from the commanded twist.
    pub fn step(&self, state: &mut RobotState, dt: f64) {
        let dt = sanitize_dt(dt);

        // Commanded twist becomes the integrated one (no dynamics)
        state.v_linear = state.v_linear_cmd;
        state.v_angular = state.v_angular_cmd;

        if dt == 0.0 {
            return;
        }

        state.heading += state.v_angular * dt;

        match self.policy {
            IntegrationPolicy::RotateInPlace => {}
            IntegrationPolicy::Translate => {
                self.translate(state, dt);
            }
            IntegrationPolicy::TranslateWrap { width, height } => {
                self.translate(state, dt);
                state.x = wrap(state.x, width);
                state.y = wrap(state.y, height);
            }
        }

        self.advance_tracks(state, dt);
    }

    /// Advance only the tread phases from the observed twist; pose is left
    /// to remote telemetry.
    pub fn animate_tracks(&self, state: &mut RobotState, dt: f64) {
        let dt = sanitize_dt(dt);
        if dt == 0.0 {
            return;
        }
        self.advance_tracks(state, dt);
    }

    fn translate(&self, state: &mut RobotState, dt: f64) {
        let direction = Vector2::new(state.heading.cos(), state.heading.sin());
        let delta = direction * (state.v_linear * dt);
        state.x += delta.x;
        state.y += delta.y;
    }

    fn advance_tracks(&self, state: &mut RobotState, dt: f64) {
        let speeds =
            self.body_twist_to_track_speeds(&BodyTwist::new(state.v_linear, state.v_angular));
        state.track_phase_left += speeds.left * self.phase_gain * dt;
        state.track_phase_right += speeds.right * self.phase_gain * dt;
    }
}

fn wrap(value: f64, extent: f64) -> f64 {
    if extent > 0.0 && value.is_finite() {
        value.rem_euclid(extent)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn kinematics(policy: IntegrationPolicy) -> DiffDriveKinematics {
        DiffDriveKinematics::new(&KinematicsConfig {
            half_track: 0.18,
            phase_gain: 60.0,
            policy,
        })
    }

    #[test]
    fn test_degenerate_dt_is_noop() {
        let kin = kinematics(IntegrationPolicy::Translate);
        for dt in [-1.0, f64::NAN, f64::NEG_INFINITY, f64::INFINITY, 0.0] {
            let mut state = RobotState::default();
            state.x = 1.0;
            state.y = 2.0;
            state.heading = 0.4;
            state.v_linear_cmd = 0.5;
            state.v_angular_cmd = 0.3;

            kin.step(&mut state, dt);

            assert_eq!((state.x, state.y, state.heading), (1.0, 2.0, 0.4), "dt={dt}");
            assert_eq!(state.track_phase_left, 0.0);
            assert_eq!(state.track_phase_right, 0.0);
        }
    }

    #[test]
    fn test_straight_line_translation() {
        let kin = kinematics(IntegrationPolicy::Translate);
        let mut state = RobotState::default();
        state.heading = 0.7;
        state.v_linear_cmd = 0.5;

        kin.step(&mut state, 1.0);

        assert!((state.heading - 0.7).abs() < EPS);
        assert!((state.x - 0.7_f64.cos() * 0.5).abs() < EPS);
        assert!((state.y - 0.7_f64.sin() * 0.5).abs() < EPS);
        assert_eq!(state.v_linear, 0.5);
        // Straight motion drives both treads equally
        assert!((state.track_phase_left - 30.0).abs() < EPS);
        assert!((state.track_phase_right - 30.0).abs() < EPS);
    }

    #[test]
    fn test_rotate_in_place_keeps_position() {
        let kin = kinematics(IntegrationPolicy::RotateInPlace);
        let mut state = RobotState::default();
        state.x = 4.0;
        state.y = 3.0;
        state.v_linear_cmd = 0.5;
        state.v_angular_cmd = 1.0;

        kin.step(&mut state, 0.5);

        assert_eq!((state.x, state.y), (4.0, 3.0));
        assert!((state.heading - 0.5).abs() < EPS);
        // vL = 0.5 - 0.18, vR = 0.5 + 0.18
        assert!((state.track_phase_left - 0.32 * 60.0 * 0.5).abs() < EPS);
        assert!((state.track_phase_right - 0.68 * 60.0 * 0.5).abs() < EPS);
    }

    #[test]
    fn test_wrap_around_viewport() {
        let kin = kinematics(IntegrationPolicy::TranslateWrap {
            width: 10.0,
            height: 5.0,
        });
        let mut state = RobotState::default();
        state.x = 9.8;
        state.y = 0.1;
        state.v_linear_cmd = 0.5;

        kin.step(&mut state, 1.0);
        assert!((state.x - 0.3).abs() < EPS);

        state.heading = -std::f64::consts::FRAC_PI_2;
        state.v_linear_cmd = 1.0;
        kin.step(&mut state, 0.5);
        assert!((state.y - 4.6).abs() < 1e-6);
    }

    #[test]
    fn test_track_phase_accumulates_without_reset() {
        let kin = kinematics(IntegrationPolicy::RotateInPlace);
        let mut state = RobotState::default();
        state.v_linear_cmd = 1.0;

        for _ in 0..100 {
            kin.step(&mut state, 0.1);
        }
        assert!((state.track_phase_left - 600.0).abs() < 1e-6);
        let offset = tread_offset(state.track_phase_left, 6.0);
        assert!((0.0..6.0).contains(&offset));
    }

    #[test]
    fn test_animate_tracks_leaves_pose() {
        let kin = kinematics(IntegrationPolicy::Translate);
        let mut state = RobotState::default();
        state.v_linear = 0.2;
        state.v_linear_cmd = 5.0;

        kin.animate_tracks(&mut state, 1.0);

        assert_eq!((state.x, state.y, state.heading), (0.0, 0.0, 0.0));
        assert_eq!(state.v_linear, 0.2);
        assert!((state.track_phase_left - 12.0).abs() < EPS);
    }

    #[test]
    fn test_inverse_kinematics() {
        let kin = kinematics(IntegrationPolicy::RotateInPlace);
        let original = BodyTwist::new(0.4, -0.9);

        let speeds = kin.body_twist_to_track_speeds(&original);
        let recovered = kin.track_speeds_to_body_twist(&speeds);

        assert!((original.v - recovered.v).abs() < 1e-6);
        assert!((original.omega - recovered.omega).abs() < 1e-6);
    }

    #[test]
    fn test_tread_offset_handles_negative_phase() {
        assert!((tread_offset(-1.0, 6.0) - 5.0).abs() < EPS);
        assert_eq!(tread_offset(10.0, 0.0), 0.0);
        assert_eq!(tread_offset(f64::NAN, 6.0), 0.0);
    }
}
