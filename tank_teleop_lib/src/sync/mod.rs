pub mod endpoint;
pub mod loopback;
pub mod network_sync;

pub use endpoint::*;
pub use loopback::*;
pub use network_sync::*;
