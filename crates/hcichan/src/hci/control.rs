//! Controller lifecycle operations
//!
//! Each call opens its own raw socket, issues one control operation and
//! closes the socket again. None of them need an open user channel.

use crate::error::{ControlOp, HciError};
use crate::hci::device::{DeviceInfo, DeviceRequest};
use crate::hci::ioctl::{ControlCode, HCIDEVDOWN, HCIDEVRESET, HCIDEVUP, HCIGETDEVINFO};
use crate::hci::sys::{Descriptor, RawSocket};
use crate::hci::Result;
use log::debug;

impl ControlOp {
    /// The ioctl that carries this operation
    pub fn code(self) -> ControlCode {
        match self {
            ControlOp::Up => HCIDEVUP,
            ControlOp::Down => HCIDEVDOWN,
            ControlOp::Reset => HCIDEVRESET,
            ControlOp::Info => HCIGETDEVINFO,
        }
    }
}

/// Issues an index-argument control operation on an existing socket
pub(crate) fn device_control<D: Descriptor>(
    desc: &D,
    op: ControlOp,
    dev_id: u16,
) -> Result<()> {
    debug!("hci{}: {}", dev_id, op);
    desc.device_ioctl(op.code(), dev_id)
        .map_err(|source| HciError::ControlError { op, dev_id, source })
}

fn device_info<D: Descriptor>(desc: &D, dev_id: u16) -> Result<DeviceInfo> {
    let mut record = DeviceInfo::request(dev_id);
    desc.device_info(&mut record)
        .map_err(|source| HciError::ControlError {
            op: ControlOp::Info,
            dev_id,
            source,
        })?;
    Ok(DeviceInfo::decode(&record))
}

/// Runs `f` on a fresh socket and closes it afterwards.
///
/// If `f` fails the socket is dropped and the close result is not reported.
fn with_control_socket<D, T>(
    open: impl FnOnce() -> Result<D>,
    f: impl FnOnce(&D) -> Result<T>,
) -> Result<T>
where
    D: Descriptor,
{
    let desc = open()?;
    let out = f(&desc)?;
    desc.release().map_err(HciError::CloseError)?;
    Ok(out)
}

pub(crate) fn control_with<D: Descriptor>(
    open: impl FnOnce() -> Result<D>,
    op: ControlOp,
    dev_id: u16,
) -> Result<()> {
    with_control_socket(open, |desc| device_control(desc, op, dev_id))
}

pub(crate) fn info_with<D: Descriptor>(
    open: impl FnOnce() -> Result<D>,
    dev_id: u16,
) -> Result<DeviceInfo> {
    with_control_socket(open, |desc| device_info(desc, dev_id))
}

pub(crate) fn device_list_with<D: Descriptor>(
    open: impl FnOnce() -> Result<D>,
) -> Result<Vec<DeviceRequest>> {
    with_control_socket(open, |desc| desc.list_devices().map_err(HciError::DeviceListError))
}

pub(crate) fn devices_with<D: Descriptor>(
    open: impl FnOnce() -> Result<D>,
) -> Result<Vec<DeviceInfo>> {
    with_control_socket(open, |desc| {
        let list = desc.list_devices().map_err(HciError::DeviceListError)?;
        list.iter()
            .map(|req| device_info(desc, req.dev_id))
            .collect()
    })
}

/// Brings a controller up
pub fn up(dev_id: u16) -> Result<()> {
    control_with(RawSocket::open, ControlOp::Up, dev_id)
}

/// Takes a controller down
pub fn down(dev_id: u16) -> Result<()> {
    control_with(RawSocket::open, ControlOp::Down, dev_id)
}

/// Resets a controller through the kernel
pub fn reset(dev_id: u16) -> Result<()> {
    control_with(RawSocket::open, ControlOp::Reset, dev_id)
}

/// Fetches the kernel's descriptor of a controller
pub fn info(dev_id: u16) -> Result<DeviceInfo> {
    info_with(RawSocket::open, dev_id)
}

/// Lists the controllers known to the kernel (at most 16)
pub fn device_list() -> Result<Vec<DeviceRequest>> {
    device_list_with(RawSocket::open)
}

/// Lists the controllers known to the kernel together with their details
pub fn devices() -> Result<Vec<DeviceInfo>> {
    devices_with(RawSocket::open)
}
