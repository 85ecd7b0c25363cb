//! Register-level driver for IntelliDAQ Multi-Function (IDMF) boards.
//!
//! The board exposes DACs, ADCs, three digital ports, 24 GPIO lines, eight
//! quadrature encoders and a status LED through one I/O window. The kernel
//! driver makes that window reachable through a character device with a
//! single register read/write ioctl; this crate encodes everything above
//! it: the register map, bit-field semantics, the ADC acquisition sequence,
//! and the bit-serial protocol of the ADC reference DAC.
//!
//! # Architecture
//!
//! ## Device Access
//! - [`Board`] - Owned board handle with cached output latches
//! - [`RegisterTransport`] - Single-register access; [`CharDevice`] for
//!   hardware, [`MockTransport`] for tests
//! - [`BoardConfig`] - Declarative board setup from TOML and environment
//!
//! ## Subsystems
//! - [`Dac`] - Staged analog outputs with a common update
//! - [`Adc`] - Reference programming and request/run/acquire sequencing
//! - [`Port`] - Three 8-bit digital ports
//! - [`Gpio`] - 24 general-purpose lines
//! - [`Encoder`] - Quadrature counters with x1/x2/x4 decoding
//! - [`Led`] - Status LED
//!
//! ## Error Policy
//!
//! Only opening a board can fail outright. Every other operation keeps the
//! board's permissive contract: out-of-range channels are ignored on write
//! and read as zero, and failed register accesses are logged as warnings.
//! Each operation also has a `try_*` form returning [`IdmfError`].
//!
//! # Examples
//!
//! ## One-Shot Acquisition
//!
//! ```no_run
//! use idmf::{Board, ReferenceCounts};
//!
//! # fn example() -> idmf::Result<()> {
//! let board = Board::open("idmf0")?;
//!
//! let reference = ReferenceCounts::from_volts(3.2768, 4.0100);
//! board.adc().configure(reference.adc, reference.ina);
//! board.adc().update();
//!
//! for channel in 0..8 {
//!     println!("AI{}: {}", channel, board.adc().read(channel));
//! }
//!
//! board.close()
//! # }
//! ```
//!
//! ## Testing Without Hardware
//!
//! ```
//! use idmf::{Board, MockTransport, RegisterAddress};
//!
//! let mock = MockTransport::new();
//! let board = Board::with_transport("idmf0", mock.clone())?;
//!
//! board.led().write(7);
//! assert_eq!(mock.register(RegisterAddress::BCT_LED), 1);
//! # Ok::<(), idmf::IdmfError>(())
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod mock;
pub mod registers;
pub mod subsystem;
pub mod transport;

pub use config::{AdcConfig, BoardConfig, EncoderConfig, GpioConfig, PortConfig};
pub use device::{AdcPhase, Board, BoardState};
pub use error::{IdmfError, Result};
pub use mock::{Access, MockTransport};
pub use registers::{
    PortControl, RegisterAddress, RequestDirection, ALL_CHANNELS, NUM_ADCS, NUM_DACS, NUM_ENCS,
    NUM_GPIOS, NUM_PORTS, NUM_PORT_CHANNELS,
};
pub use subsystem::adc::{reference_load_sequence, Adc, AdcTiming, ReferenceCounts};
pub use subsystem::dac::Dac;
pub use subsystem::encoder::{Encoder, EncoderMode};
pub use subsystem::gpio::Gpio;
pub use subsystem::led::Led;
pub use subsystem::port::Port;
pub use transport::{device_path, CharDevice, RegisterTransport};
