//! Error types for the hcichan library
//!
//! Every variant names the step that failed so callers can tell a missing
//! adapter apart from a busy one or a broken transport.

use std::fmt;
use std::io;
use thiserror::Error;

/// Control operations issued against a device index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOp {
    Up,
    Down,
    Reset,
    Info,
}

impl fmt::Display for ControlOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControlOp::Up => "up device",
            ControlOp::Down => "down device",
            ControlOp::Reset => "reset device",
            ControlOp::Info => "get device info",
        };
        f.write_str(s)
    }
}

/// Errors that can occur when working with HCI sockets
#[derive(Error, Debug)]
pub enum HciError {
    #[error("can't create socket: {0}")]
    SocketError(#[source] io::Error),

    #[error("can't {op} hci{dev_id}: {source}")]
    ControlError {
        op: ControlOp,
        dev_id: u16,
        #[source]
        source: io::Error,
    },

    #[error("can't get device list: {0}")]
    DeviceListError(#[source] io::Error),

    #[error("can't bind socket to hci{dev_id} user channel: {source}")]
    BindError {
        dev_id: u16,
        #[source]
        source: io::Error,
    },

    #[error("can't read hci socket: {0}")]
    ReceiveError(#[source] io::Error),

    #[error("can't write hci socket: {0}")]
    SendError(#[source] io::Error),

    #[error("can't close hci socket: {0}")]
    CloseError(#[source] io::Error),

    #[error("hci socket is closed")]
    Closed,

    #[error("invalid device index: {0}")]
    InvalidDevice(i32),

    #[error("no devices available: {0}")]
    NoDevicesAvailable(String),
}

impl HciError {
    /// True when the kernel refused the user channel because another
    /// socket already holds the device.
    pub fn is_busy(&self) -> bool {
        match self {
            HciError::BindError { source, .. } => source.raw_os_error() == Some(libc::EBUSY),
            _ => false,
        }
    }

    /// The device index the failure is attributed to, if any
    pub fn dev_id(&self) -> Option<u16> {
        match self {
            HciError::ControlError { dev_id, .. } | HciError::BindError { dev_id, .. } => {
                Some(*dev_id)
            }
            _ => None,
        }
    }
}

impl From<HciError> for io::Error {
    fn from(err: HciError) -> Self {
        match err {
            HciError::ReceiveError(e) | HciError::SendError(e) | HciError::CloseError(e) => e,
            HciError::Closed => io::Error::new(io::ErrorKind::NotConnected, err),
            other => io::Error::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_names_device() {
        let err = HciError::BindError {
            dev_id: 3,
            source: io::Error::from_raw_os_error(libc::EBUSY),
        };

        let msg = err.to_string();
        assert!(msg.contains("hci3"));
        assert!(msg.contains("bind"));
        assert!(err.is_busy());
        assert_eq!(err.dev_id(), Some(3));
    }

    #[test]
    fn test_control_error_message() {
        let err = HciError::ControlError {
            op: ControlOp::Down,
            dev_id: 1,
            source: io::Error::from_raw_os_error(libc::ENODEV),
        };

        assert!(err.to_string().starts_with("can't down device hci1: "));
        assert!(!err.is_busy());
    }

    #[test]
    fn test_into_io_error_keeps_kind() {
        let err = HciError::ReceiveError(io::Error::new(io::ErrorKind::Interrupted, "intr"));
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::Interrupted);

        let io_err: io::Error = HciError::Closed.into();
        assert_eq!(io_err.kind(), io::ErrorKind::NotConnected);
    }
}
