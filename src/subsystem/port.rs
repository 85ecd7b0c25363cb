//! Digital port subsystem.
//!
//! Three 8-bit ports (X, Y, Z) with a shared direction register. Writes go
//! through a cached output latch so single lines can be changed without
//! reading back the pins.

use crate::device::Board;
use crate::error::Result;
use crate::registers::{PortControl, RegisterAddress, NUM_PORTS, NUM_PORT_CHANNELS};
use crate::subsystem::{check_channel, check_lines, permissive, Lines};
use crate::transport::RegisterTransport;

const GROUP: &str = "port";

/// Digital port accessor.
pub struct Port<'a, T: RegisterTransport> {
    board: &'a Board<T>,
}

impl<'a, T: RegisterTransport> Port<'a, T> {
    pub(crate) fn new(board: &'a Board<T>) -> Self {
        Self { board }
    }

    /// Number of ports.
    pub fn n_ports(&self) -> usize {
        NUM_PORTS
    }

    /// Set the port directions; `true` makes a port an output.
    pub fn configure(&self, x_output: bool, y_output: bool, z_output: bool) {
        permissive(GROUP, self.try_configure(x_output, y_output, z_output))
    }

    /// Read a port from the pins.
    ///
    /// `channel` is [`ALL_CHANNELS`](crate::ALL_CHANNELS) for the whole
    /// byte or `0..8` for a single line (returned as 0 or 1). The value is
    /// the signal on the pins whatever the direction; an overloaded output
    /// may read differently from what was written. Out of range reads 0.
    pub fn read(&self, port: i32, channel: i32) -> u8 {
        permissive(GROUP, self.try_read(port, channel))
    }

    /// Write a port through its output latch.
    ///
    /// With [`ALL_CHANNELS`](crate::ALL_CHANNELS) the latch is replaced by
    /// `value`; otherwise line `channel` is set when `value` is nonzero and
    /// cleared when it is zero. The latch is then written to the port. On an
    /// input port the pins follow only once it is configured as output. Out
    /// of range is a no-op.
    pub fn write(&self, port: i32, channel: i32, value: u8) {
        permissive(GROUP, self.try_write(port, channel, value))
    }

    /// Cached output latch of a port. Out of range reads 0.
    pub fn latch(&self, port: i32) -> u8 {
        match check_channel(GROUP, port, NUM_PORTS) {
            Ok(port) => self.board.with_inner(|inner| inner.state.port_values[port]),
            Err(_) => 0,
        }
    }

    /// Strict [`configure`](Self::configure).
    pub fn try_configure(&self, x_output: bool, y_output: bool, z_output: bool) -> Result<()> {
        let ctrl = PortControl::for_outputs(x_output, y_output, z_output);
        self.board
            .with_inner(|inner| inner.write(RegisterAddress::PRT_CTRL, u32::from(ctrl.bits())))
    }

    /// Strict [`read`](Self::read).
    pub fn try_read(&self, port: i32, channel: i32) -> Result<u8> {
        let port = check_channel(GROUP, port, NUM_PORTS)?;
        let lines = check_lines(GROUP, channel, NUM_PORT_CHANNELS)?;

        let value = self
            .board
            .with_inner(|inner| inner.read(RegisterAddress::port_value(port)))? as u8;

        Ok(match lines {
            Lines::All => value,
            Lines::Bit(bit) => (value >> bit) & 0x01,
        })
    }

    /// Strict [`write`](Self::write).
    pub fn try_write(&self, port: i32, channel: i32, value: u8) -> Result<()> {
        let port = check_channel(GROUP, port, NUM_PORTS)?;
        let lines = check_lines(GROUP, channel, NUM_PORT_CHANNELS)?;

        self.board.with_inner(|inner| {
            let latch = &mut inner.state.port_values[port];
            *latch = match lines {
                Lines::All => value,
                Lines::Bit(bit) => (*latch & !(1 << bit)) | (u8::from(value != 0) << bit),
            };
            let latch = *latch;
            inner.write(RegisterAddress::port_value(port), u32::from(latch))
        })
    }
}
