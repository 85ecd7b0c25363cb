//! Quadrature encoder subsystem.

use tracing::debug;

use crate::device::Board;
use crate::error::{IdmfError, Result};
use crate::registers::{RegisterAddress, NUM_ENCS};
use crate::subsystem::{check_channel, permissive};
use crate::transport::RegisterTransport;

const GROUP: &str = "encoder";

/// Counting resolution of an encoder channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderMode {
    /// One count per encoder period
    X1,
    /// Two counts per encoder period
    X2,
    /// Four counts per encoder period
    X4,
}

impl EncoderMode {
    /// Mode for the multiplier `1`, `2` or `4`.
    pub fn from_raw(mode: i32) -> Option<Self> {
        match mode {
            1 => Some(Self::X1),
            2 => Some(Self::X2),
            4 => Some(Self::X4),
            _ => None,
        }
    }

    /// Counts per encoder period.
    pub fn multiplier(self) -> i32 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }

    /// Decoder control word for this mode.
    pub fn control_word(self) -> u32 {
        match self {
            Self::X1 => 0x0002_0080,
            Self::X2 => 0x0006_0090,
            Self::X4 => 0x0006_9096,
        }
    }
}

impl TryFrom<i32> for EncoderMode {
    type Error = IdmfError;

    fn try_from(mode: i32) -> Result<Self> {
        Self::from_raw(mode).ok_or(IdmfError::InvalidEncoderMode { mode })
    }
}

/// Encoder accessor.
pub struct Encoder<'a, T: RegisterTransport> {
    board: &'a Board<T>,
}

impl<'a, T: RegisterTransport> Encoder<'a, T> {
    pub(crate) fn new(board: &'a Board<T>) -> Self {
        Self { board }
    }

    /// Number of encoder channels.
    pub fn n_channels(&self) -> usize {
        NUM_ENCS
    }

    /// Set the counting mode of a channel. Out of range is a no-op.
    pub fn configure(&self, channel: i32, mode: EncoderMode) {
        permissive(GROUP, self.try_configure(channel, mode))
    }

    /// Set the counting mode from its multiplier.
    ///
    /// Anything other than 1, 2 or 4 leaves the channel untouched.
    pub fn configure_raw(&self, channel: i32, mode: i32) {
        match EncoderMode::from_raw(mode) {
            Some(mode) => self.configure(channel, mode),
            None => debug!(channel, mode, "Ignoring unknown encoder mode"),
        }
    }

    /// Current count as a signed 32-bit number. Out of range reads 0.
    pub fn read(&self, channel: i32) -> i32 {
        permissive(GROUP, self.try_read(channel))
    }

    /// Load a new count. Out of range is a no-op.
    pub fn write(&self, channel: i32, count: i32) {
        permissive(GROUP, self.try_write(channel, count))
    }

    /// Zero the count of a channel.
    pub fn reset(&self, channel: i32) {
        self.write(channel, 0)
    }

    /// Strict [`configure`](Self::configure).
    pub fn try_configure(&self, channel: i32, mode: EncoderMode) -> Result<()> {
        let channel = check_channel(GROUP, channel, NUM_ENCS)?;
        debug!(channel, ?mode, "Configuring encoder");
        self.board.with_inner(|inner| {
            inner.write(RegisterAddress::encoder_control(channel), mode.control_word())
        })
    }

    /// Strict [`configure_raw`](Self::configure_raw).
    pub fn try_configure_raw(&self, channel: i32, mode: i32) -> Result<()> {
        self.try_configure(channel, EncoderMode::try_from(mode)?)
    }

    /// Strict [`read`](Self::read).
    pub fn try_read(&self, channel: i32) -> Result<i32> {
        let channel = check_channel(GROUP, channel, NUM_ENCS)?;
        let raw = self
            .board
            .with_inner(|inner| inner.read(RegisterAddress::encoder_count(channel)))?;
        Ok(raw as i32)
    }

    /// Strict [`write`](Self::write).
    pub fn try_write(&self, channel: i32, count: i32) -> Result<()> {
        let channel = check_channel(GROUP, channel, NUM_ENCS)?;
        self.board.with_inner(|inner| {
            inner.write(RegisterAddress::encoder_count(channel), count as u32)
        })
    }
}
