//! # Tank Teleop Library
//!
//! Shared state, control and synchronization for the tracked robot
//! operator console: the canonical robot state record, differential-drive
//! integration, manipulator geometry, input arbitration, mode routing and
//! best-effort sync with the remote robot.

pub mod control;
pub mod sync;
pub mod types;
pub mod utils;

// Re-export everything for convenience
pub use control::*;
pub use sync::*;
pub use types::*;
pub use utils::*;
