pub mod diff_drive_kinematics;
pub mod manipulator;
pub mod tracing;

pub use diff_drive_kinematics::*;
pub use manipulator::*;
pub use self::tracing::*;
