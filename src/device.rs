//! Board handle and cached board state.
//!
//! This module provides the main [`Board`] type, which owns the register
//! transport together with the latches the hardware does not echo back, and
//! hands out the functional-group accessors.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::BoardConfig;
use crate::error::Result;
use crate::registers::{
    RegisterAddress, BOARD_POWER_OFF, ENC_POWER_ALL, NUM_ADCS, NUM_PORTS,
};
use crate::subsystem::adc::{Adc, AdcTiming};
use crate::subsystem::dac::Dac;
use crate::subsystem::encoder::Encoder;
use crate::subsystem::gpio::Gpio;
use crate::subsystem::led::Led;
use crate::subsystem::port::Port;
use crate::transport::{CharDevice, RegisterTransport};

/// Phase of the ADC acquisition sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdcPhase {
    /// No acquisition in progress
    #[default]
    Idle,
    /// Sample-and-hold started
    Requested,
    /// Conversion running
    Converting,
    /// Samples read into the cache
    Acquired,
}

/// Values the board does not report back, mirrored in memory.
///
/// Port and GPIO latches hold the last value written by this process and
/// are the base for single-bit updates. They are not the pin state; reads
/// through [`Port::read`] and [`Gpio::read`] always go to the hardware.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoardState {
    /// Samples from the last acquisition, indexed by channel
    pub adc_values: [i16; NUM_ADCS],
    /// Port output latches
    pub port_values: [u8; NUM_PORTS],
    /// GPIO output latch
    pub gpio_values: u32,
    /// Where the acquisition sequence currently stands
    pub adc_phase: AdcPhase,
}

/// Transport and state guarded together by the board lock.
pub(crate) struct BoardInner<T> {
    pub(crate) transport: T,
    pub(crate) state: BoardState,
}

impl<T: RegisterTransport> BoardInner<T> {
    pub(crate) fn read(&mut self, address: RegisterAddress) -> Result<u32> {
        self.transport.read_register(address)
    }

    pub(crate) fn write(&mut self, address: RegisterAddress, value: u32) -> Result<()> {
        self.transport.write_register(address, value)
    }
}

/// An open IntelliDAQ Multi-Function board.
///
/// The board owns its transport channel and the cached latch state. All
/// operations go through functional-group accessors borrowed from it:
///
/// ```no_run
/// use idmf::Board;
///
/// let board = Board::open("idmf0")?;
/// board.led().write(1);
/// board.dac().write(0, 0x1000);
/// board.dac().update();
/// board.close()?;
/// # Ok::<(), idmf::IdmfError>(())
/// ```
///
/// # Thread Safety
///
/// The contract is one writer per board. Transport and cache sit behind a
/// single lock, so multi-register sequences from different threads do not
/// interleave, but callers racing on the same latch still see one another's
/// bits in unspecified order.
pub struct Board<T: RegisterTransport = CharDevice> {
    name: String,
    path: String,
    adc_timing: AdcTiming,
    inner: Mutex<BoardInner<T>>,
}

impl Board<CharDevice> {
    /// Open a board by device name (`"idmf0"`) or path.
    ///
    /// # Errors
    ///
    /// Returns an error if the device node cannot be opened or the
    /// initialisation writes are rejected. No board is produced.
    pub fn open(device_name: &str) -> Result<Self> {
        let transport = CharDevice::open(device_name)?;
        let path = transport.path().to_string();
        Self::init(device_name, path, transport)
    }

    /// Open the board named in `config` and apply the rest of it.
    pub fn open_with_config(config: &BoardConfig) -> Result<Self> {
        config.validate()?;
        let mut board = Self::open(&config.device)?;
        config.apply(&mut board);
        Ok(board)
    }
}

impl<T: RegisterTransport> Board<T> {
    /// Build a board over an already open transport.
    ///
    /// Performs the same initialisation as [`Board::open`].
    pub fn with_transport(device_name: &str, transport: T) -> Result<Self> {
        Self::init(device_name, device_name.to_string(), transport)
    }

    fn init(name: &str, path: String, transport: T) -> Result<Self> {
        let mut inner = BoardInner {
            transport,
            state: BoardState::default(),
        };

        inner.write(RegisterAddress::BCT_PWR, BOARD_POWER_OFF)?;
        inner.write(RegisterAddress::ENC_PWRCTRL, ENC_POWER_ALL)?;

        info!(name = %name, path = %path, "Initialised IDMF board");

        Ok(Self {
            name: name.to_string(),
            path,
            adc_timing: AdcTiming::default(),
            inner: Mutex::new(inner),
        })
    }

    /// Close the transport channel. The board is consumed.
    ///
    /// A failure is reported but leaves nothing to retry; callers are
    /// expected to log it.
    pub fn close(self) -> Result<()> {
        let Self { name, inner, .. } = self;
        let mut inner = inner.into_inner();
        match inner.transport.close() {
            Ok(()) => {
                debug!(name = %name, "Closed IDMF board");
                Ok(())
            }
            Err(e) => {
                warn!(name = %name, error = %e, "Error closing IDMF board");
                Err(e)
            }
        }
    }

    /// Name the board was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved path of the device node.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Snapshot of the cached state.
    pub fn state(&self) -> BoardState {
        self.inner.lock().state.clone()
    }

    /// Settle and convert delays used by [`Adc::update`].
    pub fn adc_timing(&self) -> AdcTiming {
        self.adc_timing
    }

    /// Change the settle and convert delays. Values below the hardware
    /// minimums are raised to them.
    pub fn set_adc_timing(&mut self, timing: AdcTiming) {
        self.adc_timing = timing.clamped();
    }

    /// Execute a closure with exclusive access to transport and state.
    pub(crate) fn with_inner<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut BoardInner<T>) -> R,
    {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// DAC accessor.
    pub fn dac(&self) -> Dac<'_, T> {
        Dac::new(self)
    }

    /// ADC accessor.
    pub fn adc(&self) -> Adc<'_, T> {
        Adc::new(self)
    }

    /// Digital port accessor.
    pub fn port(&self) -> Port<'_, T> {
        Port::new(self)
    }

    /// GPIO accessor.
    pub fn gpio(&self) -> Gpio<'_, T> {
        Gpio::new(self)
    }

    /// Encoder accessor.
    pub fn encoder(&self) -> Encoder<'_, T> {
        Encoder::new(self)
    }

    /// Status LED accessor.
    pub fn led(&self) -> Led<'_, T> {
        Led::new(self)
    }
}

impl<T: RegisterTransport> std::fmt::Debug for Board<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("adc_timing", &self.adc_timing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    #[test]
    fn test_init_sequence() {
        let mock = MockTransport::new();
        let board = Board::with_transport("idmf0", mock.clone()).unwrap();

        assert_eq!(
            mock.writes(),
            vec![
                (RegisterAddress::BCT_PWR, 0x00),
                (RegisterAddress::ENC_PWRCTRL, 0xFF)
            ]
        );
        assert_eq!(board.state(), BoardState::default());
        assert_eq!(board.name(), "idmf0");
    }

    #[test]
    fn test_init_failure_yields_no_board() {
        let mock = MockTransport::new();
        mock.fail_next(-19);
        assert!(Board::with_transport("idmf0", mock).is_err());
    }

    #[test]
    fn test_close_reports_failure() {
        let mock = MockTransport::new();
        let board = Board::with_transport("idmf0", mock.clone()).unwrap();
        mock.fail_close(-9);
        assert!(matches!(
            board.close(),
            Err(crate::IdmfError::CloseFailed { errno: -9, .. })
        ));
    }

    #[test]
    fn test_board_is_sync() {
        fn assert_sync<S: Send + Sync>() {}
        assert_sync::<Board<MockTransport>>();
        assert_sync::<Board<CharDevice>>();
    }
}
