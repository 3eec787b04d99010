//! Controller descriptors exchanged with the HCI ioctls
//!
//! The kernel fills fixed-size C records; this module declares their layout
//! once and decodes them into owned Rust types.

use crate::hci::constants::HCI_MAX_DEV;
use bitflags::bitflags;
use byteorder::{ByteOrder, NativeEndian};
use std::fmt;

bitflags! {
    /// Device state bits reported in `hci_dev_info.flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DeviceFlags: u32 {
        const UP = 1 << 0;
        const INIT = 1 << 1;
        const RUNNING = 1 << 2;
        const PSCAN = 1 << 3;
        const ISCAN = 1 << 4;
        const AUTH = 1 << 5;
        const ENCRYPT = 1 << 6;
        const INQUIRY = 1 << 7;
        const RAW = 1 << 8;
    }
}

impl fmt::Display for DeviceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(name)?;
            first = false;
        }
        if first {
            f.write_str("DOWN")?;
        }
        Ok(())
    }
}

/// A Bluetooth device address, stored little-endian as the kernel does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BdAddr {
    pub bytes: [u8; 6],
}

impl BdAddr {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.bytes[5],
            self.bytes[4],
            self.bytes[3],
            self.bytes[2],
            self.bytes[1],
            self.bytes[0]
        )
    }
}

/// Traffic counters kept by the kernel for one controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStats {
    pub err_rx: u32,
    pub err_tx: u32,
    pub cmd_tx: u32,
    pub evt_rx: u32,
    pub acl_tx: u32,
    pub acl_rx: u32,
    pub sco_tx: u32,
    pub sco_rx: u32,
    pub byte_rx: u32,
    pub byte_tx: u32,
}

/// Owned view of `struct hci_dev_info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub dev_id: u16,
    pub name: String,
    pub address: BdAddr,
    pub flags: DeviceFlags,
    pub dev_type: u8,
    pub features: [u8; 8],
    pub pkt_type: u32,
    pub link_policy: u32,
    pub link_mode: u32,
    pub acl_mtu: u16,
    pub acl_pkts: u16,
    pub sco_mtu: u16,
    pub sco_pkts: u16,
    pub stats: DeviceStats,
}

/// Byte layout of `struct hci_dev_info` (linux/include/net/bluetooth/hci_sock.h)
pub(crate) mod layout {
    use std::ops::Range;

    pub const DEV_ID: usize = 0;
    pub const NAME: Range<usize> = 2..10;
    pub const BDADDR: Range<usize> = 10..16;
    pub const FLAGS: usize = 16;
    pub const TYPE: usize = 20;
    pub const FEATURES: Range<usize> = 21..29;
    pub const PKT_TYPE: usize = 32;
    pub const LINK_POLICY: usize = 36;
    pub const LINK_MODE: usize = 40;
    pub const ACL_MTU: usize = 44;
    pub const ACL_PKTS: usize = 46;
    pub const SCO_MTU: usize = 48;
    pub const SCO_PKTS: usize = 50;
    pub const STAT: usize = 52;
    pub const STAT_FIELDS: usize = 10;

    pub const SIZE: usize = STAT + STAT_FIELDS * 4;
}

/// Raw image of `struct hci_dev_info` as passed to `HCIGETDEVINFO`
pub(crate) type DeviceInfoBuf = [u8; layout::SIZE];

impl DeviceInfo {
    /// Builds the ioctl argument: a zeroed record carrying only the index
    pub(crate) fn request(dev_id: u16) -> DeviceInfoBuf {
        let mut buf = [0u8; layout::SIZE];
        NativeEndian::write_u16(&mut buf[layout::DEV_ID..], dev_id);
        buf
    }

    /// Decodes a record filled in by the kernel
    pub(crate) fn decode(buf: &DeviceInfoBuf) -> Self {
        let name_bytes = &buf[layout::NAME];
        let name_len = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());

        let mut address = [0u8; 6];
        address.copy_from_slice(&buf[layout::BDADDR]);

        let mut features = [0u8; 8];
        features.copy_from_slice(&buf[layout::FEATURES]);

        let mut stat = [0u32; layout::STAT_FIELDS];
        NativeEndian::read_u32_into(&buf[layout::STAT..layout::SIZE], &mut stat);

        Self {
            dev_id: NativeEndian::read_u16(&buf[layout::DEV_ID..]),
            name: String::from_utf8_lossy(&name_bytes[..name_len]).into_owned(),
            address: BdAddr::new(address),
            flags: DeviceFlags::from_bits_retain(NativeEndian::read_u32(&buf[layout::FLAGS..])),
            dev_type: buf[layout::TYPE],
            features,
            pkt_type: NativeEndian::read_u32(&buf[layout::PKT_TYPE..]),
            link_policy: NativeEndian::read_u32(&buf[layout::LINK_POLICY..]),
            link_mode: NativeEndian::read_u32(&buf[layout::LINK_MODE..]),
            acl_mtu: NativeEndian::read_u16(&buf[layout::ACL_MTU..]),
            acl_pkts: NativeEndian::read_u16(&buf[layout::ACL_PKTS..]),
            sco_mtu: NativeEndian::read_u16(&buf[layout::SCO_MTU..]),
            sco_pkts: NativeEndian::read_u16(&buf[layout::SCO_PKTS..]),
            stats: DeviceStats {
                err_rx: stat[0],
                err_tx: stat[1],
                cmd_tx: stat[2],
                evt_rx: stat[3],
                acl_tx: stat[4],
                acl_rx: stat[5],
                sco_tx: stat[6],
                sco_rx: stat[7],
                byte_rx: stat[8],
                byte_tx: stat[9],
            },
        }
    }

    pub fn is_up(&self) -> bool {
        self.flags.contains(DeviceFlags::UP)
    }

    /// LMP feature bitmap as a hex string
    pub fn features_hex(&self) -> String {
        hex::encode(self.features)
    }
}

/// One entry of the kernel's device list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRequest {
    pub dev_id: u16,
    pub opt: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct RawDeviceRequest {
    dev_id: u16,
    dev_opt: u32,
}

/// `struct hci_dev_list_req` with room for `HCI_MAX_DEV` entries
#[repr(C)]
#[derive(Debug)]
pub(crate) struct DeviceListRequest {
    dev_num: u16,
    dev_req: [RawDeviceRequest; HCI_MAX_DEV],
}

impl DeviceListRequest {
    pub(crate) fn new() -> Self {
        Self {
            dev_num: HCI_MAX_DEV as u16,
            dev_req: [RawDeviceRequest::default(); HCI_MAX_DEV],
        }
    }

    /// Entries the kernel reported; anything past `dev_num` is never read.
    pub(crate) fn entries(&self) -> Vec<DeviceRequest> {
        let count = usize::from(self.dev_num).min(HCI_MAX_DEV);
        self.dev_req[..count]
            .iter()
            .map(|r| DeviceRequest {
                dev_id: r.dev_id,
                opt: r.dev_opt,
            })
            .collect()
    }
}
