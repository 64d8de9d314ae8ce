pub mod asm;
pub mod device;
pub mod devices;
pub mod host_error;
pub mod memory;
pub mod ops;
pub mod stack;
pub mod uxn;

pub use device::{Device, DeviceBus, DeviceCtx};
pub use host_error::HostError;
pub use memory::Ram;
pub use stack::Stack;
pub use uxn::Uxn;
