//! General-purpose I/O subsystem.
//!
//! The 24 lines are split across two stacked direction registers that must
//! always carry the same mask. Inputs are read live from `GPIO_IN`; outputs
//! are committed from a cached latch to `GPIO_OUT`.

use crate::device::Board;
use crate::error::Result;
use crate::registers::{RegisterAddress, NUM_GPIOS};
use crate::subsystem::{check_lines, permissive, Lines};
use crate::transport::RegisterTransport;

const GROUP: &str = "GPIO";

/// GPIO accessor.
pub struct Gpio<'a, T: RegisterTransport> {
    board: &'a Board<T>,
}

impl<'a, T: RegisterTransport> Gpio<'a, T> {
    pub(crate) fn new(board: &'a Board<T>) -> Self {
        Self { board }
    }

    /// Number of GPIO lines.
    pub fn n_channels(&self) -> usize {
        NUM_GPIOS
    }

    /// Set the line directions: a one bit makes that line an output.
    pub fn configure(&self, dirs: u32) {
        permissive(GROUP, self.try_configure(dirs))
    }

    /// Read the line levels.
    ///
    /// [`ALL_CHANNELS`](crate::ALL_CHANNELS) returns the whole word, `0..24`
    /// a single line as 0 or 1. Out of range reads 0.
    pub fn read(&self, channel: i32) -> u32 {
        permissive(GROUP, self.try_read(channel))
    }

    /// Write the output latch and commit it.
    ///
    /// [`ALL_CHANNELS`](crate::ALL_CHANNELS) replaces the latch; a single
    /// line is set for a nonzero `value` and cleared for zero. Lines
    /// configured as input follow only once switched to output. Out of
    /// range is a no-op.
    pub fn write(&self, channel: i32, value: u32) {
        permissive(GROUP, self.try_write(channel, value))
    }

    /// Cached output latch.
    pub fn latch(&self) -> u32 {
        self.board.with_inner(|inner| inner.state.gpio_values)
    }

    /// Strict [`configure`](Self::configure).
    pub fn try_configure(&self, dirs: u32) -> Result<()> {
        self.board.with_inner(|inner| {
            inner.write(RegisterAddress::GPIO_DIR0, dirs)?;
            inner.write(RegisterAddress::GPIO_DIR1, dirs)
        })
    }

    /// Strict [`read`](Self::read).
    pub fn try_read(&self, channel: i32) -> Result<u32> {
        let lines = check_lines(GROUP, channel, NUM_GPIOS)?;
        let value = self
            .board
            .with_inner(|inner| inner.read(RegisterAddress::GPIO_IN))?;

        Ok(match lines {
            Lines::All => value,
            Lines::Bit(bit) => (value >> bit) & 0x01,
        })
    }

    /// Strict [`write`](Self::write).
    pub fn try_write(&self, channel: i32, value: u32) -> Result<()> {
        let lines = check_lines(GROUP, channel, NUM_GPIOS)?;

        self.board.with_inner(|inner| {
            let latch = &mut inner.state.gpio_values;
            *latch = match lines {
                Lines::All => value,
                Lines::Bit(bit) => (*latch & !(1 << bit)) | (u32::from(value != 0) << bit),
            };
            let latch = *latch;
            inner.write(RegisterAddress::GPIO_OUT, latch)
        })
    }
}
