use crate::{clamp_unit, ManipulatorGeometry, RobotState};
use nalgebra::{Isometry2, Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Manipulator joint positions in the base's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManipulatorChain {
    pub turret_origin: Point2<f64>,
    pub boom_root: Point2<f64>,
    pub fixed_link_end: Point2<f64>,
    pub tip: Point2<f64>,
    pub finger_left: Point2<f64>,
    pub finger_right: Point2<f64>,
    /// Half-angle between the fingers and the boom axis (radians)
    pub opening_angle: f64,
    /// Current telescopic length
    pub telescope_length: f64,
}

/// Turret → fixed link → telescoping link → gripper.
///
/// The boom extends along the turret's local -X axis. The gripper opening
/// is `(1 - gripper) * max_open_rad`: a closure of 1.0 means no opening.
#[derive(Debug, Clone)]
pub struct ManipulatorModel {
    geometry: ManipulatorGeometry,
}

impl ManipulatorModel {
    pub fn new(geometry: ManipulatorGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &ManipulatorGeometry {
        &self.geometry
    }

    /// Opening half-angle for a gripper closure fraction.
    pub fn opening_angle(&self, gripper: f64) -> f64 {
        (1.0 - clamp_unit(gripper)) * self.geometry.max_open_rad
    }

    pub fn chain_for(&self, state: &RobotState) -> ManipulatorChain {
        self.chain(state.turret_angle(), state.arm_extension(), state.gripper())
    }

    /// Compute the chain for raw joint values. Out-of-range extension and
    /// gripper values are clamped to [0, 1] first.
    pub fn chain(&self, turret_deg: f64, arm_extension: f64, gripper: f64) -> ManipulatorChain {
        let g = &self.geometry;
        let turret_rad = if turret_deg.is_finite() {
            turret_deg.to_radians()
        } else {
            0.0
        };
        let extension = clamp_unit(arm_extension);
        let opening = self.opening_angle(gripper);

        let turret_frame = Isometry2::new(
            Vector2::new(g.turret_offset[0], g.turret_offset[1]),
            turret_rad,
        );

        // Everything below is expressed in the turret frame
        let boom_dir = Vector2::new(-1.0, 0.0);
        let boom_root = Point2::new(g.boom_root[0], g.boom_root[1]);
        let fixed_end = boom_root + boom_dir * g.fixed_link;
        let telescope_length = g.telescope_max * extension;
        let tip = fixed_end + boom_dir * telescope_length;

        let boom_angle = boom_dir.y.atan2(boom_dir.x);
        let finger = |angle: f64| tip + Vector2::new(angle.cos(), angle.sin()) * g.finger_length;
        let finger_left = finger(boom_angle - opening);
        let finger_right = finger(boom_angle + opening);

        ManipulatorChain {
            turret_origin: turret_frame * Point2::origin(),
            boom_root: turret_frame * boom_root,
            fixed_link_end: turret_frame * fixed_end,
            tip: turret_frame * tip,
            finger_left: turret_frame * finger_left,
            finger_right: turret_frame * finger_right,
            opening_angle: opening,
            telescope_length,
        }
    }
}

/// Planar joint angles of the physical arm (shoulder, elbow, wrist), radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarArmJoints {
    pub shoulder: f64,
    pub elbow: f64,
    pub wrist: f64,
}

/// Two-link inverse kinematics driving the physical arm from a single
/// extension fraction. The target slides linearly from a high, close point
/// to a low, far point as extension goes 0 → 1.
#[derive(Debug, Clone)]
pub struct ExtensionIk {
    pub upper_link: f64,
    pub lower_link: f64,
    pub min_reach: f64,
    pub max_reach: f64,
    pub start_height: f64,
    pub end_height: f64,
}

impl Default for ExtensionIk {
    fn default() -> Self {
        let upper_link = 0.35;
        let lower_link = 0.30;
        Self {
            upper_link,
            lower_link,
            min_reach: 0.05,
            max_reach: upper_link + lower_link - 0.05,
            start_height: 0.25,
            end_height: -0.10,
        }
    }
}

impl ExtensionIk {
    pub fn solve(&self, extension: f64) -> PlanarArmJoints {
        let t = clamp_unit(extension);
        let (l1, l2) = (self.upper_link, self.lower_link);

        let mut target = Vector2::new(
            self.min_reach + (self.max_reach - self.min_reach) * t,
            self.start_height + (self.end_height - self.start_height) * t,
        );

        // Keep the target inside the reachable annulus
        let dist = target.norm();
        let r_min = (l1 - l2).abs() + 1e-3;
        let r_max = l1 + l2 - 1e-3;
        if dist > 1e-3 {
            target *= dist.clamp(r_min, r_max) / dist;
        }

        let cos_elbow =
            ((target.norm_squared() - l1 * l1 - l2 * l2) / (2.0 * l1 * l2)).clamp(-1.0, 1.0);
        let elbow = cos_elbow.acos();

        let k1 = l1 + l2 * elbow.cos();
        let k2 = l2 * elbow.sin();
        let shoulder = target.y.atan2(target.x) - k2.atan2(k1);

        PlanarArmJoints {
            shoulder,
            elbow,
            wrist: -(shoulder + elbow) * 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn model() -> ManipulatorModel {
        ManipulatorModel::new(ManipulatorGeometry::default())
    }

    #[test]
    fn test_gripper_convention() {
        let model = model();
        assert_eq!(model.opening_angle(1.0), 0.0);
        assert!((model.opening_angle(0.0) - 0.6).abs() < EPS);

        let closed = model.chain(0.0, 0.5, 1.0);
        assert!((closed.finger_left - closed.finger_right).norm() < EPS);
    }

    #[test]
    fn test_out_of_range_inputs_match_clamped() {
        let model = model();
        for (ext, grip) in [(1.8, -0.4), (-3.0, 2.5), (f64::NAN, f64::NAN)] {
            let raw = model.chain(30.0, ext, grip);
            let clamped = model.chain(30.0, clamp_unit(ext), clamp_unit(grip));
            assert_eq!(raw, clamped);
        }
    }

    #[test]
    fn test_zero_turret_geometry() {
        let model = model();
        let chain = model.chain(0.0, 0.5, 0.3);

        assert_eq!(chain.turret_origin, Point2::new(-36.0, 0.0));
        assert!((chain.boom_root - Point2::new(-36.0, -8.0)).norm() < EPS);
        assert!((chain.fixed_link_end - Point2::new(-76.0, -8.0)).norm() < EPS);
        assert!((chain.tip - Point2::new(-106.0, -8.0)).norm() < EPS);
        assert!((chain.telescope_length - 30.0).abs() < EPS);
    }

    #[test]
    fn test_turret_rotation_moves_tip_about_pivot() {
        let model = model();
        let straight = model.chain(0.0, 1.0, 0.0);
        let rotated = model.chain(90.0, 1.0, 0.0);

        let pivot = straight.turret_origin;
        let reach_straight = (straight.tip - pivot).norm();
        let reach_rotated = (rotated.tip - pivot).norm();
        assert!((reach_straight - reach_rotated).abs() < 1e-9);
        // -X in the turret frame becomes -Y after a 90 degree yaw
        assert!(rotated.tip.y < pivot.y - 90.0);
    }

    #[test]
    fn test_chain_from_state_uses_clamped_fields() {
        let model = model();
        let mut state = RobotState::default();
        state.set_arm_extension(0.25);
        state.set_gripper(0.5);
        state.set_turret_angle(-20.0);

        assert_eq!(model.chain_for(&state), model.chain(-20.0, 0.25, 0.5));
    }

    #[test]
    fn test_extension_ik_reaches_target() {
        let ik = ExtensionIk::default();
        for ext in [0.0, 0.3, 0.7, 1.0] {
            let joints = ik.solve(ext);
            let x = ik.upper_link * joints.shoulder.cos()
                + ik.lower_link * (joints.shoulder + joints.elbow).cos();
            let z = ik.upper_link * joints.shoulder.sin()
                + ik.lower_link * (joints.shoulder + joints.elbow).sin();

            let expect_x = ik.min_reach + (ik.max_reach - ik.min_reach) * ext;
            let expect_z = ik.start_height + (ik.end_height - ik.start_height) * ext;
            let dist = (expect_x * expect_x + expect_z * expect_z).sqrt();
            let r_max = ik.upper_link + ik.lower_link - 1e-3;
            let r_min = (ik.upper_link - ik.lower_link).abs() + 1e-3;
            let scale = dist.clamp(r_min, r_max) / dist;

            assert!((x - expect_x * scale).abs() < 1e-6, "ext={ext}");
            assert!((z - expect_z * scale).abs() < 1e-6, "ext={ext}");
            assert!((joints.wrist + (joints.shoulder + joints.elbow) * 0.5).abs() < EPS);
        }
    }
}
