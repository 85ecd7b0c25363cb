//! Analog input subsystem.
//!
//! An acquisition runs in three steps: [`Adc::request`] starts the
//! sample-and-hold, [`Adc::run`] starts the conversion, and
//! [`Adc::acquire`] drains the eight results from the data FIFO into the
//! board's sample cache. [`Adc::update`] performs all three with the
//! hardware settle and convert delays in between.
//!
//! Callers running under a real-time scheduler should use the split form
//! and sleep with their scheduler's primitive, since `std::thread::sleep`
//! gives no bound on wake-up latency.
//!
//! The input reference voltages are programmed through a bit-serial
//! interface on a separate reference DAC, see [`Adc::configure`].

use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::device::{AdcPhase, Board, BoardInner};
use crate::error::{IdmfError, Result};
use crate::registers::{
    RegisterAddress, ACQUISITION_ORDER, ADC_REF_SELECT, ADC_REQUEST, ADC_RUN, NUM_ADCS,
    REF_ADC_HEADER, REF_INA_HEADER,
};
use crate::subsystem::{check_channel, permissive};
use crate::transport::RegisterTransport;

const GROUP: &str = "ADC";

/// Frame start written to `ADC_REF` before the first bit.
const SERIAL_START: u32 = 0x00;
/// Latch pulse written to `ADC_REF` after the last bit.
const SERIAL_LATCH: u32 = 0x02;
/// Clock-high/clock-low pair shifting out a one.
const SERIAL_ONE: [u32; 2] = [0x05, 0x04];
/// Clock-high/clock-low pair shifting out a zero.
const SERIAL_ZERO: [u32; 2] = [0x01, 0x00];
/// Width of a reference DAC word.
const SERIAL_BITS: u32 = 24;

/// Full-scale voltage of the reference DAC.
pub const REFERENCE_FULL_SCALE_VOLTS: f64 = 5.0;

/// Minimum delay between request and run.
pub const MIN_SETTLE: Duration = Duration::from_micros(1);
/// Minimum delay between run and acquire.
pub const MIN_CONVERT: Duration = Duration::from_micros(3);

/// Values written to `ADC_REF` to shift one 24-bit word into the
/// reference DAC, most significant bit first.
pub fn reference_load_sequence(word: u32) -> Vec<u32> {
    let mut sequence = Vec::with_capacity(2 + 2 * SERIAL_BITS as usize);
    sequence.push(SERIAL_START);
    for bit in (0..SERIAL_BITS).rev() {
        let pulse = if word & (1 << bit) != 0 {
            SERIAL_ONE
        } else {
            SERIAL_ZERO
        };
        sequence.extend_from_slice(&pulse);
    }
    sequence.push(SERIAL_LATCH);
    sequence
}

/// Reference DAC settings in counts of `5.0 V / 65536`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReferenceCounts {
    /// ADC reference
    pub adc: u16,
    /// INA (input amplifier) reference
    pub ina: u16,
}

impl ReferenceCounts {
    /// Convert reference voltages to counts, saturating at the DAC range.
    pub fn from_volts(adc_volts: f64, ina_volts: f64) -> Self {
        Self {
            adc: volts_to_counts(adc_volts),
            ina: volts_to_counts(ina_volts),
        }
    }
}

fn volts_to_counts(volts: f64) -> u16 {
    // `as` saturates for out-of-range floats and maps NaN to 0.
    (65536.0 * volts / REFERENCE_FULL_SCALE_VOLTS) as u16
}

/// Delays used by [`Adc::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdcTiming {
    /// Delay after the sample-and-hold request
    pub settle: Duration,
    /// Delay after starting the conversion
    pub convert: Duration,
}

impl Default for AdcTiming {
    fn default() -> Self {
        Self {
            settle: MIN_SETTLE,
            convert: MIN_CONVERT,
        }
    }
}

impl AdcTiming {
    /// Timing with the delays raised to at least the hardware minimums.
    pub fn clamped(self) -> Self {
        Self {
            settle: self.settle.max(MIN_SETTLE),
            convert: self.convert.max(MIN_CONVERT),
        }
    }
}

/// Analog input accessor.
pub struct Adc<'a, T: RegisterTransport> {
    board: &'a Board<T>,
}

impl<'a, T: RegisterTransport> Adc<'a, T> {
    pub(crate) fn new(board: &'a Board<T>) -> Self {
        Self { board }
    }

    /// Number of ADC channels.
    pub fn n_channels(&self) -> usize {
        NUM_ADCS
    }

    /// Program the ADC and INA reference voltages.
    ///
    /// Selects the reference DAC, then shifts in the INA word followed by
    /// the ADC word.
    pub fn configure(&self, ref_adc_counts: u16, ref_ina_counts: u16) {
        permissive(GROUP, self.try_configure(ref_adc_counts, ref_ina_counts))
    }

    /// Start the sample-and-hold.
    pub fn request(&self) {
        permissive(
            GROUP,
            self.board.with_inner(|inner| Self::do_request(inner)),
        )
    }

    /// Start the conversion.
    pub fn run(&self) {
        permissive(
            GROUP,
            self.board.with_inner(|inner| {
                Self::note_order(inner.state.adc_phase, AdcPhase::Requested, "run");
                Self::do_run(inner)
            }),
        )
    }

    /// Read the converted samples into the cache.
    pub fn acquire(&self) {
        permissive(
            GROUP,
            self.board.with_inner(|inner| {
                Self::note_order(inner.state.adc_phase, AdcPhase::Converting, "acquire");
                Self::do_acquire(inner)
            }),
        )
    }

    /// Request, settle, run, convert, acquire.
    ///
    /// Blocks the calling thread for the configured delays.
    pub fn update(&self) {
        permissive(GROUP, self.try_update())
    }

    /// Cached sample of a channel from the last acquisition.
    ///
    /// Does not start a conversion. Out-of-range channels read 0.
    pub fn read(&self, channel: i32) -> i16 {
        permissive(GROUP, self.try_read(channel))
    }

    /// All cached samples, indexed by channel.
    pub fn samples(&self) -> [i16; NUM_ADCS] {
        self.board.with_inner(|inner| inner.state.adc_values)
    }

    /// Current phase of the acquisition sequence.
    pub fn phase(&self) -> AdcPhase {
        self.board.with_inner(|inner| inner.state.adc_phase)
    }

    /// Strict [`configure`](Self::configure).
    pub fn try_configure(&self, ref_adc_counts: u16, ref_ina_counts: u16) -> Result<()> {
        debug!(
            ref_adc = ref_adc_counts,
            ref_ina = ref_ina_counts,
            "Programming ADC references"
        );
        self.board.with_inner(|inner| {
            inner.write(RegisterAddress::ADC_DATA, ADC_REF_SELECT)?;
            Self::serial_write(inner, REF_INA_HEADER | u32::from(ref_ina_counts))?;
            Self::serial_write(inner, REF_ADC_HEADER | u32::from(ref_adc_counts))
        })
    }

    /// Strict [`request`](Self::request). Allowed from any phase.
    pub fn try_request(&self) -> Result<()> {
        self.board.with_inner(|inner| Self::do_request(inner))
    }

    /// Strict [`run`](Self::run). Requires a pending request.
    pub fn try_run(&self) -> Result<()> {
        self.board.with_inner(|inner| {
            Self::expect_phase(inner, AdcPhase::Requested)?;
            Self::do_run(inner)
        })
    }

    /// Strict [`acquire`](Self::acquire). Requires a running conversion.
    pub fn try_acquire(&self) -> Result<()> {
        self.board.with_inner(|inner| {
            Self::expect_phase(inner, AdcPhase::Converting)?;
            Self::do_acquire(inner)
        })
    }

    /// Strict [`update`](Self::update).
    pub fn try_update(&self) -> Result<()> {
        let timing = self.board.adc_timing();
        self.board.with_inner(|inner| {
            Self::do_request(inner)?;
            thread::sleep(timing.settle);
            Self::do_run(inner)?;
            thread::sleep(timing.convert);
            Self::do_acquire(inner)
        })
    }

    /// Strict [`read`](Self::read).
    pub fn try_read(&self, channel: i32) -> Result<i16> {
        let channel = check_channel(GROUP, channel, NUM_ADCS)?;
        Ok(self
            .board
            .with_inner(|inner| inner.state.adc_values[channel]))
    }

    fn serial_write(inner: &mut BoardInner<T>, word: u32) -> Result<()> {
        for value in reference_load_sequence(word) {
            inner.write(RegisterAddress::ADC_REF, value)?;
        }
        Ok(())
    }

    fn do_request(inner: &mut BoardInner<T>) -> Result<()> {
        inner.write(RegisterAddress::BCT_ADC, ADC_REQUEST)?;
        inner.state.adc_phase = AdcPhase::Requested;
        Ok(())
    }

    fn do_run(inner: &mut BoardInner<T>) -> Result<()> {
        inner.write(RegisterAddress::BCT_ADC, ADC_RUN)?;
        inner.state.adc_phase = AdcPhase::Converting;
        Ok(())
    }

    fn do_acquire(inner: &mut BoardInner<T>) -> Result<()> {
        for &channel in &ACQUISITION_ORDER {
            let raw = inner.read(RegisterAddress::ADC_DATA)?;
            inner.state.adc_values[channel] = raw as i16;
        }
        inner.state.adc_phase = AdcPhase::Acquired;
        Ok(())
    }

    fn expect_phase(inner: &BoardInner<T>, expected: AdcPhase) -> Result<()> {
        let actual = inner.state.adc_phase;
        if actual != expected {
            return Err(IdmfError::Sequence { expected, actual });
        }
        Ok(())
    }

    fn note_order(actual: AdcPhase, expected: AdcPhase, step: &str) {
        if actual != expected {
            debug!(step, ?expected, ?actual, "ADC step issued out of sequence");
        }
    }
}
