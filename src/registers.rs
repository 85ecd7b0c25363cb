//! Register catalogue for the IntelliDAQ Multi-Function board.
//!
//! Every register lives at a fixed, 4-byte aligned offset inside the board's
//! I/O window. The only runtime address arithmetic is the per-channel stride
//! used by the DAC, port and encoder blocks.

use std::fmt;

use bitflags::bitflags;

use crate::error::{IdmfError, Result};

/// Number of DAC channels.
pub const NUM_DACS: usize = 8;
/// Number of ADC channels.
pub const NUM_ADCS: usize = 8;
/// Number of 8-bit digital ports.
pub const NUM_PORTS: usize = 3;
/// Number of lines per digital port.
pub const NUM_PORT_CHANNELS: usize = 8;
/// Number of quadrature encoder channels.
pub const NUM_ENCS: usize = 8;
/// Number of general-purpose I/O lines.
pub const NUM_GPIOS: usize = 24;

/// Channel sentinel addressing a whole port or the whole GPIO word.
pub const ALL_CHANNELS: i32 = -1;

/// Stride between consecutive DAC value registers.
pub const DAC_STRIDE: u32 = 0x04;
/// Stride between consecutive port value registers.
pub const PORT_STRIDE: u32 = 0x04;
/// Stride between consecutive encoder register blocks.
pub const ENC_STRIDE: u32 = 0x40;

/// Low 28 bits of an ioctl request carry the register offset.
pub const OFFSET_MASK: u32 = 0x0FFF_FFFC;

/// Byte offset of a register in the board's I/O space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterAddress(u32);

impl RegisterAddress {
    /// DAC configuration; writing [`DAC_UPDATE`] latches all staged values.
    pub const DAC_CONF: Self = Self(0x0000);
    /// First DAC value register.
    pub const DAC_VALUE: Self = Self(0x0020);
    /// First digital port value register.
    pub const PRT_VALUE: Self = Self(0x0080);
    /// Digital port control (direction) register.
    pub const PRT_CTRL: Self = Self(0x008C);
    /// Encoder power control.
    pub const ENC_PWRCTRL: Self = Self(0x0090);
    /// GPIO direction, first bank.
    pub const GPIO_DIR0: Self = Self(0x0094);
    /// GPIO direction, second bank.
    pub const GPIO_DIR1: Self = Self(0x0098);
    /// Encoder alarm, first bank.
    pub const ENC_ALARM0: Self = Self(0x009C);
    /// Encoder alarm, second bank.
    pub const ENC_ALARM1: Self = Self(0x00A0);
    /// Encoder power status.
    pub const ENC_PWRSTAT: Self = Self(0x00A4);
    /// ADC data FIFO; also selects the reference DAC chip on write.
    pub const ADC_DATA: Self = Self(0x00A8);
    /// Bit-serial interface of the ADC reference DAC.
    pub const ADC_REF: Self = Self(0x00AC);
    /// Board status LED.
    pub const BCT_LED: Self = Self(0x0200);
    /// Board power control.
    pub const BCT_PWR: Self = Self(0x0204);
    /// ADC sample/convert control.
    pub const BCT_ADC: Self = Self(0x0208);
    /// GPIO input levels.
    pub const GPIO_IN: Self = Self(0x0210);
    /// GPIO output latch.
    pub const GPIO_OUT: Self = Self(0x0214);
    /// Encoder counter control, channel 0.
    pub const MFC_CCR: Self = Self(0x0300);
    /// Encoder counter status, channel 0.
    pub const MFC_CSR: Self = Self(0x0304);
    /// Encoder count, channel 0.
    pub const MFC_CNT: Self = Self(0x0308);
    /// Encoder preload value, channel 0.
    pub const MFC_PLV: Self = Self(0x030C);
    /// Encoder decoder control, channel 0.
    pub const MFC_DCR: Self = Self(0x0318);

    /// Wrap a raw byte offset.
    pub const fn new(offset: u32) -> Self {
        Self(offset)
    }

    /// Raw byte offset.
    pub const fn offset(self) -> u32 {
        self.0
    }

    /// Address of the `index`-th register in a block with the given stride.
    pub const fn strided(self, index: usize, stride: u32) -> Self {
        Self(self.0 + index as u32 * stride)
    }

    /// DAC value register of `channel`.
    pub const fn dac_value(channel: usize) -> Self {
        Self::DAC_VALUE.strided(channel, DAC_STRIDE)
    }

    /// Port value register of `port`.
    pub const fn port_value(port: usize) -> Self {
        Self::PRT_VALUE.strided(port, PORT_STRIDE)
    }

    /// Encoder count register of `channel`.
    pub const fn encoder_count(channel: usize) -> Self {
        Self::MFC_CNT.strided(channel, ENC_STRIDE)
    }

    /// Encoder decoder-control register of `channel`.
    pub const fn encoder_control(channel: usize) -> Self {
        Self::MFC_DCR.strided(channel, ENC_STRIDE)
    }

    /// Build the ioctl request code for an access in `direction`.
    ///
    /// The driver rejects offsets that are not a multiple of 4, so they are
    /// refused here before any system call is made.
    pub fn request(self, direction: RequestDirection) -> Result<u32> {
        if self.0 & !OFFSET_MASK != 0 {
            return Err(IdmfError::MisalignedRegister { address: self.0 });
        }
        Ok(direction.bits() | self.0)
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

bitflags! {
    /// Direction bits in the high nibble of a register request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RequestDirection: u32 {
        /// Copy a value from the caller into the register.
        const WRITE = 0x1000_0000;
        /// Copy the register value out to the caller.
        const READ = 0x2000_0000;
    }
}

bitflags! {
    /// Bits of the digital port control byte.
    ///
    /// A set `*_INPUT` bit makes that port an input; the power-on value has
    /// every port as an input.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PortControl: u8 {
        /// Port X input bits (cleared by the `0xF6` mask).
        const X_INPUT = 0x09;
        /// Port Z input bit (cleared by the `0xFD` mask).
        const Z_INPUT = 0x02;
        /// Port Y input bit (cleared by the `0xEF` mask).
        const Y_INPUT = 0x10;
        /// Mode-set flag, always written.
        const MODE_SET = 0x80;
    }
}

impl PortControl {
    /// Control byte with every port configured as input (`0x9B`).
    pub const BASE: Self = Self::all();

    /// Control byte for the requested output directions.
    pub fn for_outputs(x_output: bool, y_output: bool, z_output: bool) -> Self {
        let mut ctrl = Self::BASE;
        if x_output {
            ctrl.remove(Self::X_INPUT);
        }
        if y_output {
            ctrl.remove(Self::Y_INPUT);
        }
        if z_output {
            ctrl.remove(Self::Z_INPUT);
        }
        ctrl
    }
}

/// Command word written to `DAC_CONF` to latch all staged DAC values.
pub const DAC_UPDATE: u32 = 0x0000_C000;

/// `BCT_ADC` value starting sample-and-hold.
pub const ADC_REQUEST: u32 = 0x01;
/// `BCT_ADC` value starting conversion.
pub const ADC_RUN: u32 = 0x00;
/// `ADC_DATA` value selecting the reference DAC before a serial load.
pub const ADC_REF_SELECT: u32 = 0x0C;

/// Header of the serial word carrying the INA reference.
pub const REF_INA_HEADER: u32 = 0x0010_0000;
/// Header of the serial word carrying the ADC reference.
pub const REF_ADC_HEADER: u32 = 0x0024_0000;

/// Encoder power mask enabling every channel.
pub const ENC_POWER_ALL: u32 = 0xFF;
/// Board power-control value written at open.
pub const BOARD_POWER_OFF: u32 = 0x00;

/// Register-read order of `ADC_DATA` mapped to logical channel indices.
///
/// The k-th read of `ADC_DATA` after a conversion carries the sample of
/// channel `ACQUISITION_ORDER[k]`.
pub const ACQUISITION_ORDER: [usize; NUM_ADCS] = [5, 4, 1, 0, 3, 2, 7, 6];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strided_addresses() {
        assert_eq!(RegisterAddress::dac_value(0).offset(), 0x20);
        assert_eq!(RegisterAddress::dac_value(7).offset(), 0x3C);
        assert_eq!(RegisterAddress::port_value(2).offset(), 0x88);
        assert_eq!(RegisterAddress::encoder_count(1).offset(), 0x348);
        assert_eq!(RegisterAddress::encoder_control(7).offset(), 0x318 + 7 * 0x40);
    }

    #[test]
    fn test_request_codes() {
        let read = RegisterAddress::GPIO_IN
            .request(RequestDirection::READ)
            .unwrap();
        assert_eq!(read, 0x2000_0210);

        let write = RegisterAddress::BCT_LED
            .request(RequestDirection::WRITE)
            .unwrap();
        assert_eq!(write, 0x1000_0200);
    }

    #[test]
    fn test_request_rejects_misaligned() {
        let err = RegisterAddress::new(0x0202)
            .request(RequestDirection::READ)
            .unwrap_err();
        assert!(matches!(err, IdmfError::MisalignedRegister { address: 0x0202 }));

        let err = RegisterAddress::new(0x1000_0000)
            .request(RequestDirection::WRITE)
            .unwrap_err();
        assert!(matches!(err, IdmfError::MisalignedRegister { .. }));
    }

    #[test]
    fn test_port_control_masks() {
        assert_eq!(PortControl::BASE.bits(), 0x9B);
        assert_eq!(PortControl::for_outputs(false, false, false).bits(), 0x9B);
        assert_eq!(PortControl::for_outputs(true, false, false).bits(), 0x9B & 0xF6);
        assert_eq!(PortControl::for_outputs(false, true, false).bits(), 0x9B & 0xEF);
        assert_eq!(PortControl::for_outputs(false, false, true).bits(), 0x9B & 0xFD);
        assert_eq!(
            PortControl::for_outputs(true, true, true).bits(),
            0x9B & 0xF6 & 0xEF & 0xFD
        );
    }

    #[test]
    fn test_acquisition_order_is_permutation() {
        let mut seen = [false; NUM_ADCS];
        for &ch in &ACQUISITION_ORDER {
            assert!(!seen[ch]);
            seen[ch] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_display() {
        assert_eq!(RegisterAddress::BCT_ADC.to_string(), "0x0208");
    }
}
