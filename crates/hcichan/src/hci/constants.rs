//! HCI socket constants
//!
//! This module contains constants for the kernel's Bluetooth socket family
//! and the HCI framing this crate touches.

use std::time::Duration;

// Bluetooth socket constants
pub const AF_BLUETOOTH: i32 = 31;
pub const BTPROTO_HCI: i32 = 1;

// sockaddr_hci channels
pub const HCI_CHANNEL_USER: u16 = 1;

// HCI packet types
pub const HCI_COMMAND_PKT: u8 = 0x01;
pub const HCI_ACL_PKT: u8 = 0x02;
pub const HCI_SCO_PKT: u8 = 0x03;
pub const HCI_EVENT_PKT: u8 = 0x04;
pub const HCI_ISO_PKT: u8 = 0x05;

/// Upper bound of the kernel's device list ioctl
pub const HCI_MAX_DEV: usize = 16;

/// Frame written to the controller when a user channel is closed.
///
/// Command packet, opcode 0x1009, no parameters. Kept byte for byte; the
/// protocol layer above relies on this exact sequence.
pub const HCI_CLOSE_FRAME: [u8; 4] = [HCI_COMMAND_PKT, 0x09, 0x10, 0x00];

/// How long to wait for stale input right after binding
pub const DRAIN_TIMEOUT: Duration = Duration::from_millis(20);

/// How much stale input is discarded after binding
pub const DRAIN_LEN: usize = 100;

/// Device index that selects the first available controller
pub const HCI_DEV_ANY: i32 = -1;
