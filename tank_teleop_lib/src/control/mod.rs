pub mod input_arbiter;
pub mod mode_router;
pub mod teleop_loop;

pub use input_arbiter::*;
pub use mode_router::*;
pub use teleop_loop::*;
