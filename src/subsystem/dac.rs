//! Analog output subsystem.
//!
//! DAC values are staged per channel and only reach the outputs when
//! [`Dac::update`] latches all of them at once.

use tracing::debug;

use crate::device::Board;
use crate::error::Result;
use crate::registers::{RegisterAddress, DAC_UPDATE, NUM_DACS};
use crate::subsystem::{check_channel, permissive};
use crate::transport::RegisterTransport;

const GROUP: &str = "DAC";

/// Analog output accessor.
pub struct Dac<'a, T: RegisterTransport> {
    board: &'a Board<T>,
}

impl<'a, T: RegisterTransport> Dac<'a, T> {
    pub(crate) fn new(board: &'a Board<T>) -> Self {
        Self { board }
    }

    /// Number of DAC channels.
    pub fn n_channels(&self) -> usize {
        NUM_DACS
    }

    /// Read the staged value of a channel.
    ///
    /// This is the register content, which differs from the output until
    /// the next [`update`](Self::update). Out-of-range channels read 0.
    pub fn read(&self, channel: i32) -> i16 {
        permissive(GROUP, self.try_read(channel))
    }

    /// Stage a value for a channel. Out-of-range channels are ignored.
    pub fn write(&self, channel: i32, value: i16) {
        permissive(GROUP, self.try_write(channel, value))
    }

    /// Latch all staged values to the analog outputs.
    pub fn update(&self) {
        permissive(GROUP, self.try_update())
    }

    /// Stage every channel, then latch them with a single update.
    pub fn write_all(&self, values: &[i16; NUM_DACS]) {
        permissive(GROUP, self.try_write_all(values))
    }

    /// Strict [`read`](Self::read).
    pub fn try_read(&self, channel: i32) -> Result<i16> {
        let channel = check_channel(GROUP, channel, NUM_DACS)?;
        let raw = self
            .board
            .with_inner(|inner| inner.read(RegisterAddress::dac_value(channel)))?;
        Ok(raw as i16)
    }

    /// Strict [`write`](Self::write).
    pub fn try_write(&self, channel: i32, value: i16) -> Result<()> {
        let channel = check_channel(GROUP, channel, NUM_DACS)?;
        // Sign-extended, as the register takes the full 32-bit word.
        self.board.with_inner(|inner| {
            inner.write(RegisterAddress::dac_value(channel), value as i32 as u32)
        })
    }

    /// Strict [`update`](Self::update).
    pub fn try_update(&self) -> Result<()> {
        debug!("Latching DAC outputs");
        self.board
            .with_inner(|inner| inner.write(RegisterAddress::DAC_CONF, DAC_UPDATE))
    }

    /// Strict [`write_all`](Self::write_all).
    pub fn try_write_all(&self, values: &[i16; NUM_DACS]) -> Result<()> {
        self.board.with_inner(|inner| {
            for (channel, &value) in values.iter().enumerate() {
                inner.write(RegisterAddress::dac_value(channel), value as i32 as u32)?;
            }
            inner.write(RegisterAddress::DAC_CONF, DAC_UPDATE)
        })
    }
}
