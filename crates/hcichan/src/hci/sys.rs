//! Raw Bluetooth HCI socket
//!
//! `Descriptor` is the set of kernel calls the open sequence and the
//! transport need. `RawSocket` implements it with libc; tests substitute a
//! recording fake.

use crate::error::HciError;
use crate::hci::constants::*;
use crate::hci::device::{layout, DeviceListRequest, DeviceRequest};
use crate::hci::ioctl::{ControlCode, HCIGETDEVINFO, HCIGETDEVLIST};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Kernel operations on one raw HCI socket
pub trait Descriptor: Send + Sync {
    /// Issues a device ioctl whose argument is the controller index
    fn device_ioctl(&self, code: ControlCode, dev_id: u16) -> io::Result<()>;

    /// Fills a `hci_dev_info` record whose leading index names the controller
    fn device_info(&self, record: &mut [u8]) -> io::Result<()>;

    /// Lists up to `HCI_MAX_DEV` controllers
    fn list_devices(&self) -> io::Result<Vec<DeviceRequest>>;

    /// Binds the socket to `dev_id` on the exclusive user channel
    fn bind_user_channel(&self, dev_id: u16) -> io::Result<()>;

    /// Waits up to `timeout` for the socket to become readable
    fn poll_readable(&self, timeout: Duration) -> io::Result<bool>;

    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Gives the descriptor back to the kernel
    fn release(&self) -> io::Result<()>;
}

// Define the sockaddr_hci structure
#[repr(C)]
struct SockaddrHci {
    hci_family: libc::sa_family_t,
    hci_dev: u16,
    hci_channel: u16,
}

/// An `AF_BLUETOOTH`/`BTPROTO_HCI` raw socket
#[derive(Debug)]
pub struct RawSocket {
    fd: RawFd,
    released: AtomicBool,
}

impl RawSocket {
    /// Opens a new, unbound raw HCI socket
    pub fn open() -> Result<Self, HciError> {
        let fd = unsafe {
            libc::socket(
                AF_BLUETOOTH,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                BTPROTO_HCI,
            )
        };

        if fd < 0 {
            return Err(HciError::SocketError(io::Error::last_os_error()));
        }

        Ok(RawSocket {
            fd,
            released: AtomicBool::new(false),
        })
    }

    fn ioctl_ptr(&self, code: ControlCode, arg: *mut libc::c_void) -> io::Result<()> {
        match unsafe { libc::ioctl(self.fd, code.as_raw() as _, arg) } {
            -1 => Err(io::Error::last_os_error()),
            _ => Ok(()),
        }
    }
}

impl Descriptor for RawSocket {
    fn device_ioctl(&self, code: ControlCode, dev_id: u16) -> io::Result<()> {
        let arg = libc::c_ulong::from(dev_id);
        match unsafe { libc::ioctl(self.fd, code.as_raw() as _, arg) } {
            -1 => Err(io::Error::last_os_error()),
            _ => Ok(()),
        }
    }

    fn device_info(&self, record: &mut [u8]) -> io::Result<()> {
        if record.len() < layout::SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "device info record too short",
            ));
        }
        self.ioctl_ptr(HCIGETDEVINFO, record.as_mut_ptr().cast())
    }

    fn list_devices(&self) -> io::Result<Vec<DeviceRequest>> {
        let mut req = DeviceListRequest::new();
        self.ioctl_ptr(HCIGETDEVLIST, (&mut req as *mut DeviceListRequest).cast())?;
        Ok(req.entries())
    }

    fn bind_user_channel(&self, dev_id: u16) -> io::Result<()> {
        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as libc::sa_family_t,
            hci_dev: dev_id,
            hci_channel: HCI_CHANNEL_USER,
        };

        let result = unsafe {
            libc::bind(
                self.fd,
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<SockaddrHci>() as libc::socklen_t,
            )
        };

        if result < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn poll_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        match unsafe { libc::poll(&mut pfd, 1, timeout_ms) } {
            -1 => Err(io::Error::last_os_error()),
            0 => Ok(false),
            _ => Ok(pfd.revents & libc::POLLIN != 0),
        }
    }

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::write(self.fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn release(&self) -> io::Result<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match unsafe { libc::close(self.fd) } {
            -1 => Err(io::Error::last_os_error()),
            _ => Ok(()),
        }
    }
}

impl AsRawFd for RawSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for RawSocket {
    fn drop(&mut self) {
        if !self.released.load(Ordering::Acquire) {
            unsafe {
                libc::close(self.fd);
            }
        }
    }
}
