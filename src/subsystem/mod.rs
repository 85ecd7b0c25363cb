//! Functional groups of the board.
//!
//! - [`dac`] - Analog outputs with staged values and a common commit
//! - [`adc`] - Analog inputs, reference programming and acquisition
//! - [`port`] - Three 8-bit digital ports
//! - [`gpio`] - 24 general-purpose I/O lines
//! - [`encoder`] - Quadrature encoder counters
//! - [`led`] - Board status LED
//!
//! Every accessor offers two flavours of each operation. The plain methods
//! keep the board's permissive contract: an out-of-range channel makes a
//! write a no-op and a read return zero, and a failed register access is
//! logged and otherwise ignored. The `try_*` methods report the same
//! conditions as [`IdmfError`].

pub mod adc;
pub mod dac;
pub mod encoder;
pub mod gpio;
pub mod led;
pub mod port;

use tracing::{trace, warn};

use crate::error::{IdmfError, Result};
use crate::registers::ALL_CHANNELS;

/// Lines addressed by a port or GPIO operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lines {
    /// The whole register
    All,
    /// A single bit
    Bit(usize),
}

/// Validate a channel index against `0..max`.
pub(crate) fn check_channel(group: &'static str, channel: i32, max: usize) -> Result<usize> {
    match usize::try_from(channel) {
        Ok(index) if index < max => Ok(index),
        _ => Err(IdmfError::ChannelOutOfRange {
            group,
            channel,
            max,
        }),
    }
}

/// Validate a line selector: [`ALL_CHANNELS`] or a bit in `0..width`.
pub(crate) fn check_lines(group: &'static str, channel: i32, width: usize) -> Result<Lines> {
    if channel == ALL_CHANNELS {
        return Ok(Lines::All);
    }
    check_channel(group, channel, width).map(Lines::Bit)
}

/// Collapse a strict result into the permissive contract.
pub(crate) fn permissive<R: Default>(group: &'static str, result: Result<R>) -> R {
    match result {
        Ok(value) => value,
        Err(e @ IdmfError::ChannelOutOfRange { .. }) => {
            trace!(group, error = %e, "Ignoring out-of-range access");
            R::default()
        }
        Err(e) => {
            warn!(group, error = %e, "Register access failed");
            R::default()
        }
    }
}
