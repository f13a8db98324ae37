pub mod commands;
pub mod config;
pub mod control_input;
pub mod robot_state;
pub mod telemetry;

pub use commands::*;
pub use config::*;
pub use control_input::*;
pub use robot_state::*;
pub use telemetry::*;
