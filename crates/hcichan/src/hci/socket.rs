//! HCI user channel transport
//!
//! This module binds a raw HCI socket to a controller in exclusive user
//! channel mode and wraps it as a thread-safe byte channel carrying HCI
//! frames.

use crate::error::{ControlOp, HciError};
use crate::hci::constants::*;
use crate::hci::control::device_control;
use crate::hci::sys::{Descriptor, RawSocket};
use crate::hci::Result;
use log::{debug, trace, warn};
use std::fmt::Write as _;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

/// Settings for the open sequence
#[derive(Debug, Clone)]
pub struct OpenConfig {
    /// How long to wait for stale input after binding
    pub drain_timeout: Duration,
    /// How many bytes of stale input to discard
    pub drain_len: usize,
}

impl Default for OpenConfig {
    fn default() -> Self {
        Self {
            drain_timeout: DRAIN_TIMEOUT,
            drain_len: DRAIN_LEN,
        }
    }
}

/// Which controller to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSelector {
    /// The first controller that accepts the user channel
    Any,
    /// Exactly this controller
    Index(u16),
}

impl DeviceSelector {
    /// Interprets a numeric index, where `-1` means any controller
    pub fn from_index(id: i32) -> Result<Self> {
        if id == HCI_DEV_ANY {
            return Ok(DeviceSelector::Any);
        }
        u16::try_from(id)
            .map(DeviceSelector::Index)
            .map_err(|_| HciError::InvalidDevice(id))
    }
}

impl From<u16> for DeviceSelector {
    fn from(dev_id: u16) -> Self {
        DeviceSelector::Index(dev_id)
    }
}

/// Moves `dev_id` into user channel mode on `desc`.
///
/// The controller is cycled down, up and down again so that a session that
/// was not shut down cleanly does not block the bind, which requires the
/// device to be down. Input that arrives right after the bind is discarded.
pub fn prepare_user_channel<D: Descriptor>(
    desc: &D,
    dev_id: u16,
    config: &OpenConfig,
) -> Result<()> {
    device_control(desc, ControlOp::Down, dev_id)?;
    device_control(desc, ControlOp::Up, dev_id)?;
    device_control(desc, ControlOp::Down, dev_id)?;

    desc.bind_user_channel(dev_id)
        .map_err(|source| HciError::BindError { dev_id, source })?;
    debug!("hci{}: bound to user channel", dev_id);

    drain(desc, dev_id, config);
    Ok(())
}

fn drain<D: Descriptor>(desc: &D, dev_id: u16, config: &OpenConfig) {
    match desc.poll_readable(config.drain_timeout) {
        Ok(true) => {
            let mut stale = vec![0u8; config.drain_len];
            match desc.read(&mut stale) {
                Ok(n) => trace!("hci{}: discarded {} stale bytes", dev_id, n),
                Err(e) => debug!("hci{}: drain read failed: {}", dev_id, e),
            }
        }
        Ok(false) => {}
        Err(e) => debug!("hci{}: drain poll failed: {}", dev_id, e),
    }
}

/// Tries each candidate in turn and returns the first one that accepted
/// the user channel.
///
/// When none does, the error lists every candidate's failure as
/// `(hci<id>: <reason>)`.
pub fn probe_devices<D: Descriptor>(
    desc: &D,
    candidates: &[u16],
    config: &OpenConfig,
) -> Result<u16> {
    let mut failures = String::new();
    for &dev_id in candidates {
        match prepare_user_channel(desc, dev_id, config) {
            Ok(()) => return Ok(dev_id),
            Err(err) => {
                debug!("hci{}: not available: {}", dev_id, err);
                let _ = write!(failures, "(hci{}: {})", dev_id, err);
            }
        }
    }
    Err(HciError::NoDevicesAvailable(failures))
}

/// A bound HCI user channel.
///
/// Reads and writes are serialised separately, so one reader and one writer
/// can use the socket at the same time from different threads.
///
/// The descriptor is only given back to the kernel while no read is in
/// flight, so a descriptor number can never be reused under a blocked reader.
#[derive(Debug)]
pub struct HciSocket<D: Descriptor = RawSocket> {
    desc: D,
    dev_id: u16,
    closed: AtomicBool,
    released: AtomicBool,
    read_lock: Mutex<()>,
    write_lock: Mutex<()>,
}

fn lock(m: &Mutex<()>) -> MutexGuard<'_, ()> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HciSocket {
    /// Opens a user channel on the selected controller
    ///
    /// # Arguments
    ///
    /// * `selector` - A controller index, or `DeviceSelector::Any` for the
    ///   first controller that can be bound
    pub fn open(selector: impl Into<DeviceSelector>) -> Result<Self> {
        Self::open_with_config(selector, &OpenConfig::default())
    }

    /// Opens a user channel with explicit settings
    pub fn open_with_config(
        selector: impl Into<DeviceSelector>,
        config: &OpenConfig,
    ) -> Result<Self> {
        let sock = RawSocket::open()?;
        Self::open_on(sock, selector.into(), config)
    }
}

impl<D: Descriptor> HciSocket<D> {
    /// Runs the open sequence on an unbound descriptor.
    ///
    /// On failure the descriptor is dropped.
    pub fn open_on(desc: D, selector: DeviceSelector, config: &OpenConfig) -> Result<Self> {
        let dev_id = match selector {
            DeviceSelector::Index(dev_id) => {
                prepare_user_channel(&desc, dev_id, config)?;
                dev_id
            }
            DeviceSelector::Any => {
                let mut candidates: Vec<u16> = desc
                    .list_devices()
                    .map_err(HciError::DeviceListError)?
                    .iter()
                    .map(|req| req.dev_id)
                    .collect();
                candidates.sort_unstable();
                debug!("probing {} controller(s): {:?}", candidates.len(), candidates);
                probe_devices(&desc, &candidates, config)?
            }
        };

        Ok(Self::from_bound(desc, dev_id))
    }

    fn from_bound(desc: D, dev_id: u16) -> Self {
        Self {
            desc,
            dev_id,
            closed: AtomicBool::new(false),
            released: AtomicBool::new(false),
            read_lock: Mutex::new(()),
            write_lock: Mutex::new(()),
        }
    }

    /// The controller this channel is bound to
    pub fn dev_id(&self) -> u16 {
        self.dev_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Reads whatever the controller sent next.
    ///
    /// Returns `Ok(0)` once the socket has been closed. A read already
    /// waiting inside the kernel is not interrupted by `close`; it finishes
    /// normally and then releases the descriptor on the closer's behalf.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if self.is_closed() {
            return Ok(0);
        }

        let result = {
            let _guard = lock(&self.read_lock);
            if self.is_closed() {
                None
            } else {
                Some(self.desc.read(buf))
            }
        };

        if self.is_closed() {
            if let Some(Err(e)) = self.release_if_idle() {
                warn!("hci{}: {}", self.dev_id, HciError::CloseError(e));
            }
        }

        match result {
            None => Ok(0),
            Some(Ok(n)) => {
                trace!("hci{}: read {} bytes", self.dev_id, n);
                Ok(n)
            }
            Some(Err(e)) => Err(HciError::ReceiveError(e)),
        }
    }

    /// Writes one frame
    pub fn write(&self, frame: &[u8]) -> Result<usize> {
        let _guard = lock(&self.write_lock);
        if self.is_closed() {
            return Err(HciError::Closed);
        }

        let n = self.desc.write(frame).map_err(HciError::SendError)?;
        trace!("hci{}: wrote {} bytes", self.dev_id, n);
        Ok(n)
    }

    /// Shuts the channel down and releases the descriptor.
    ///
    /// Only the first call has any effect; later calls return `Ok(())`.
    /// When a read is in flight the release is left to that reader, and a
    /// failure to release is then only logged.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("hci{}: already closed", self.dev_id);
            return Ok(());
        }

        {
            let _guard = lock(&self.write_lock);
            if let Err(e) = self.desc.write(&HCI_CLOSE_FRAME) {
                warn!("hci{}: failed to send close frame: {}", self.dev_id, e);
            }
        }

        debug!("hci{}: closing user channel", self.dev_id);
        match self.release_if_idle() {
            Some(result) => result.map_err(HciError::CloseError),
            None => {
                debug!("hci{}: read in flight, release deferred", self.dev_id);
                Ok(())
            }
        }
    }

    /// Releases the descriptor unless a read holds it or it is already gone.
    ///
    /// Returns `None` when nothing was released.
    fn release_if_idle(&self) -> Option<io::Result<()>> {
        let _guard = match self.read_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        if self.released.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.desc.release())
    }
}

impl<D: Descriptor> Drop for HciSocket<D> {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(e) = self.close() {
                warn!("hci{}: {}", self.dev_id, e);
            }
        }
        if let Some(Err(e)) = self.release_if_idle() {
            warn!("hci{}: {}", self.dev_id, HciError::CloseError(e));
        }
    }
}

impl AsRawFd for HciSocket<RawSocket> {
    fn as_raw_fd(&self) -> RawFd {
        self.desc.as_raw_fd()
    }
}

impl<D: Descriptor> io::Read for &HciSocket<D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        HciSocket::read(*self, buf).map_err(io::Error::from)
    }
}

impl<D: Descriptor> io::Write for &HciSocket<D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        HciSocket::write(*self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<D: Descriptor> io::Read for HciSocket<D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        HciSocket::read(self, buf).map_err(io::Error::from)
    }
}

impl<D: Descriptor> io::Write for HciSocket<D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        HciSocket::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
