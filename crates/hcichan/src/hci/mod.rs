//! Bluetooth HCI user channel access
//!
//! This module opens controllers in exclusive user channel mode and manages
//! their lifecycle through the kernel's HCI ioctls.

pub mod constants;
pub mod control;
pub mod device;
pub mod ioctl;
pub mod socket;
pub mod sys;


pub use control::{device_list, devices, down, info, reset, up};
pub use device::{BdAddr, DeviceFlags, DeviceInfo, DeviceRequest, DeviceStats};
pub use ioctl::ControlCode;
pub use socket::{prepare_user_channel, probe_devices, DeviceSelector, HciSocket, OpenConfig};
pub use sys::{Descriptor, RawSocket};

/// Result type for HCI operations
pub type Result<T> = std::result::Result<T, crate::error::HciError>;
