//! Register transport.
//!
//! The board's I/O window is reached through a character device exposing a
//! single ioctl: the request code carries a direction flag and the register
//! offset, the argument points at the 32-bit value moved in or out.

use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, IntoRawFd};

use tracing::{debug, info, trace};

use crate::error::{IdmfError, Result};
use crate::registers::{RegisterAddress, RequestDirection};

/// Single-register access to a board.
///
/// Every call is exactly one round trip through the underlying channel.
pub trait RegisterTransport {
    /// Read the 32-bit value of a register.
    fn read_register(&mut self, address: RegisterAddress) -> Result<u32>;

    /// Write a 32-bit value to a register.
    fn write_register(&mut self, address: RegisterAddress, value: u32) -> Result<()>;

    /// Release the channel. Further accesses fail with
    /// [`IdmfError::TransportClosed`].
    fn close(&mut self) -> Result<()>;
}

/// Resolve a device name to a path: bare names live under `/dev`.
pub fn device_path(name: &str) -> String {
    if name.contains('/') {
        name.to_string()
    } else {
        format!("/dev/{}", name)
    }
}

/// Transport over the board's character device.
#[derive(Debug)]
pub struct CharDevice {
    path: String,
    file: Option<File>,
}

impl CharDevice {
    /// Open the character device for `name` (`"idmf0"` or a full path).
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot be opened (not found, no
    /// permissions, already in use, etc.).
    pub fn open(name: &str) -> Result<Self> {
        let path = device_path(name);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| IdmfError::from_open(&path, e))?;

        info!(path = %path, "Opened IDMF device");

        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Path of the opened node.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn ioctl(&self, request: u32, value: &mut u32) -> Result<()> {
        let file = self.file.as_ref().ok_or(IdmfError::TransportClosed)?;

        // SAFETY: the fd is open for the lifetime of `file`, and the driver
        // copies exactly one u32 to or from `value`, which outlives the call.
        #[allow(unsafe_code)]
        let ret = unsafe { libc::ioctl(file.as_raw_fd(), request as _, value as *mut u32) };

        if ret < 0 {
            let errno = std::io::Error::last_os_error()
                .raw_os_error()
                .unwrap_or(libc::EIO);
            return Err(IdmfError::Transport {
                request,
                errno: -errno,
            });
        }
        Ok(())
    }
}

impl RegisterTransport for CharDevice {
    fn read_register(&mut self, address: RegisterAddress) -> Result<u32> {
        let request = address.request(RequestDirection::READ)?;
        let mut value = 0;
        self.ioctl(request, &mut value)?;
        trace!(register = %address, value, "reg read");
        Ok(value)
    }

    fn write_register(&mut self, address: RegisterAddress, value: u32) -> Result<()> {
        let request = address.request(RequestDirection::WRITE)?;
        let mut value = value;
        self.ioctl(request, &mut value)?;
        trace!(register = %address, value, "reg write");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let file = self.file.take().ok_or(IdmfError::TransportClosed)?;
        debug!(path = %self.path, "Closing IDMF device");

        let fd = file.into_raw_fd();
        // SAFETY: `into_raw_fd` transferred ownership of the fd to us and it
        // is closed exactly once here.
        #[allow(unsafe_code)]
        let ret = unsafe { libc::close(fd) };

        if ret < 0 {
            let errno = std::io::Error::last_os_error()
                .raw_os_error()
                .unwrap_or(libc::EIO);
            return Err(IdmfError::CloseFailed {
                path: self.path.clone(),
                errno: -errno,
            });
        }
        Ok(())
    }
}
