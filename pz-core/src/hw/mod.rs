//! Hardware interaction modules
//!
//! Line clients for each backend plus the physical pin to line mapping.

mod backend;
mod client;
mod memory;
mod pin_map;
mod remote;
mod sysfs;

pub use backend::{BackendConfig, BackendKind, GpioBackend};
pub use client::{Direction, LineClient};
#[cfg(test)]
pub use client::MockLineClient;
pub use memory::{LineOp, MemoryLineClient};
pub use pin_map::PinMap;
pub use remote::GpioDaemonClient;
pub use sysfs::SysfsGpio;
