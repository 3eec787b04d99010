//! ioctl request codes for the HCI control interface
//!
//! Codes follow the generic Linux layout: number in bits 0..8, type in
//! bits 8..16, argument size in bits 16..30 and transfer direction in the
//! top two bits.

use std::fmt;

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = 8;
const IOC_SIZESHIFT: u32 = 16;
const IOC_DIRSHIFT: u32 = 30;

const IOC_SIZEMASK: u32 = (1 << 14) - 1;

const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

/// A kernel control operation identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlCode(u32);

impl ControlCode {
    /// The raw request number passed to `ioctl(2)`
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// The direction bits (1 = write, 2 = read)
    pub const fn direction(self) -> u32 {
        self.0 >> IOC_DIRSHIFT
    }
}

impl fmt::Display for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

const fn ioc(dir: u32, ty: u8, nr: u8, size: u32) -> ControlCode {
    ControlCode(
        (dir << IOC_DIRSHIFT)
            | ((ty as u32) << IOC_TYPESHIFT)
            | ((nr as u32) << IOC_NRSHIFT)
            | ((size & IOC_SIZEMASK) << IOC_SIZESHIFT),
    )
}

/// Builds a code for an operation the kernel writes back into (`_IOR`)
pub const fn ior(ty: u8, nr: u8, size: u32) -> ControlCode {
    ioc(IOC_READ, ty, nr, size)
}

/// Builds a code for an operation that only passes data in (`_IOW`)
pub const fn iow(ty: u8, nr: u8, size: u32) -> ControlCode {
    ioc(IOC_WRITE, ty, nr, size)
}

// The HCI ioctls all declare an `int` argument regardless of what is passed.
const HCI_IOCTL_SIZE: u32 = 4;
const HCI_IOCTL_TYPE: u8 = b'H';

pub const HCIDEVUP: ControlCode = iow(HCI_IOCTL_TYPE, 201, HCI_IOCTL_SIZE);
pub const HCIDEVDOWN: ControlCode = iow(HCI_IOCTL_TYPE, 202, HCI_IOCTL_SIZE);
pub const HCIDEVRESET: ControlCode = iow(HCI_IOCTL_TYPE, 203, HCI_IOCTL_SIZE);
pub const HCIGETDEVLIST: ControlCode = ior(HCI_IOCTL_TYPE, 210, HCI_IOCTL_SIZE);
pub const HCIGETDEVINFO: ControlCode = ior(HCI_IOCTL_TYPE, 211, HCI_IOCTL_SIZE);
