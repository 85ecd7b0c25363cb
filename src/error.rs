//! Error types for IDMF board operations.
//!
//! Open failures are fatal for the handle. Everything after open is
//! permissive by default; the `try_*` methods on each subsystem surface the
//! same failures as [`IdmfError`] values instead.

use std::io;

use thiserror::Error;

use crate::device::AdcPhase;

/// Result type alias for IDMF operations.
pub type Result<T> = std::result::Result<T, IdmfError>;

/// Errors that can occur when working with an IDMF board.
#[derive(Error, Debug)]
pub enum IdmfError {
    /// Device node could not be found
    #[error("Failed to open device '{path}': {message}")]
    DeviceNotFound { path: String, message: String },

    /// Permission denied when opening the device node
    #[error("Permission denied for device '{path}'. Check udev rules or run as root.")]
    PermissionDenied { path: String },

    /// Device is already in use by another process
    #[error("Device '{path}' is busy (in use by another process)")]
    DeviceBusy { path: String },

    /// I/O error from the operating system
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Closing the transport channel failed
    #[error("Failed to close device '{path}' (errno {errno})")]
    CloseFailed { path: String, errno: i32 },

    /// Channel index outside the range of a functional group
    #[error("Invalid {group} channel {channel}: valid channels are 0..{max}")]
    ChannelOutOfRange {
        group: &'static str,
        channel: i32,
        max: usize,
    },

    /// Encoder counting mode other than 1, 2 or 4
    #[error("Invalid encoder mode {mode}: expected 1, 2 or 4")]
    InvalidEncoderMode { mode: i32 },

    /// Register offset not representable in a request code
    #[error("Register offset {address:#x} is not 4-byte aligned or exceeds 28 bits")]
    MisalignedRegister { address: u32 },

    /// Register access rejected by the driver
    #[error("Register request {request:#010x} failed (errno {errno})")]
    Transport { request: u32, errno: i32 },

    /// Transport used after it was closed
    #[error("Transport is closed")]
    TransportClosed,

    /// ADC acquisition step issued out of order
    #[error("ADC sequence error: expected phase {expected:?}, board is {actual:?}")]
    Sequence { expected: AdcPhase, actual: AdcPhase },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for IdmfError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl From<toml::de::Error> for IdmfError {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidConfig {
            message: err.to_string(),
        }
    }
}

impl IdmfError {
    /// Map an `open(2)` failure on `path` to the matching variant.
    pub(crate) fn from_open(path: &str, err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::ENOENT) | Some(libc::ENODEV) | Some(libc::ENXIO) => Self::DeviceNotFound {
                path: path.to_string(),
                message: err.to_string(),
            },
            Some(libc::EACCES) | Some(libc::EPERM) => Self::PermissionDenied {
                path: path.to_string(),
            },
            Some(libc::EBUSY) => Self::DeviceBusy {
                path: path.to_string(),
            },
            _ => Self::Io(err),
        }
    }

    /// Check if this is a "device not found" type error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DeviceNotFound { .. })
    }

    /// Check if this is a permission error.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Check if the device is busy.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::DeviceBusy { .. })
    }

    /// Check if a channel index was out of range.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::ChannelOutOfRange { .. })
    }

    /// Check if a register access failed in the transport.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::TransportClosed | Self::MisalignedRegister { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IdmfError::ChannelOutOfRange {
            group: "DAC",
            channel: 9,
            max: 8,
        };
        assert!(err.to_string().contains("DAC"));
        assert!(err.to_string().contains('9'));
        assert!(err.is_out_of_range());

        let err = IdmfError::Transport {
            request: 0x2000_0210,
            errno: -22,
        };
        assert!(err.to_string().contains("0x20000210"));
        assert!(err.is_transport());
    }

    #[test]
    fn test_from_open() {
        let err = IdmfError::from_open("/dev/idmf9", io::Error::from_raw_os_error(libc::ENOENT));
        assert!(err.is_not_found());

        let err = IdmfError::from_open("/dev/idmf0", io::Error::from_raw_os_error(libc::EACCES));
        assert!(err.is_permission_denied());

        let err = IdmfError::from_open("/dev/idmf0", io::Error::from_raw_os_error(libc::EBUSY));
        assert!(err.is_busy());

        let err = IdmfError::from_open("/dev/idmf0", io::Error::from_raw_os_error(libc::EIO));
        assert!(matches!(err, IdmfError::Io(_)));
    }
}
