//! hcichan - exclusive Bluetooth HCI user channel access for Linux
//!
//! This library binds a Bluetooth controller through the kernel's HCI user
//! channel, which grants one socket raw and exclusive access to the device,
//! and exposes it as a byte channel carrying HCI frames. It also provides
//! the controller lifecycle ioctls (up, down, reset, info, device list).
//!
//! Interpreting the frames is left to the protocol layers above.

pub mod error;
pub mod hci;

// Re-export common types for convenience
pub use error::{ControlOp, HciError};
pub use hci::{DeviceInfo, DeviceSelector, HciSocket, OpenConfig};
