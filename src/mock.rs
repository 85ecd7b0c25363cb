//! In-memory register transport for testing without hardware.
//!
//! [`MockTransport`] is a cloneable handle over a shared register file: hand
//! one clone to [`Board::with_transport`](crate::Board::with_transport) and
//! keep another to preload registers and inspect the access log.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{IdmfError, Result};
use crate::registers::{RegisterAddress, RequestDirection};
use crate::transport::RegisterTransport;

/// One recorded register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// A read returned `value`.
    Read {
        /// Register read
        address: RegisterAddress,
        /// Value returned
        value: u32,
    },
    /// `value` was written.
    Write {
        /// Register written
        address: RegisterAddress,
        /// Value written
        value: u32,
    },
}

impl Access {
    /// Register touched by this access.
    pub fn address(&self) -> RegisterAddress {
        match *self {
            Self::Read { address, .. } | Self::Write { address, .. } => address,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    registers: HashMap<RegisterAddress, u32>,
    queued: HashMap<RegisterAddress, VecDeque<u32>>,
    log: Vec<Access>,
    fail_next: Option<i32>,
    fail_close: Option<i32>,
    closed: bool,
}

/// Register file emulating an IDMF board.
///
/// Reads return the last value written to a register (zero if never
/// written), unless values were queued for it with
/// [`queue_reads`](Self::queue_reads).
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create an empty register file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a register value without recording an access.
    pub fn set_register(&self, address: RegisterAddress, value: u32) {
        self.state.lock().registers.insert(address, value);
    }

    /// Current register value (zero if never written).
    pub fn register(&self, address: RegisterAddress) -> u32 {
        self.state
            .lock()
            .registers
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    /// Queue values returned by successive reads of `address`, ahead of the
    /// stored register value. Used for FIFO registers such as `ADC_DATA`.
    pub fn queue_reads<I>(&self, address: RegisterAddress, values: I)
    where
        I: IntoIterator<Item = u32>,
    {
        self.state
            .lock()
            .queued
            .entry(address)
            .or_default()
            .extend(values);
    }

    /// Fail the next register access with the given errno.
    pub fn fail_next(&self, errno: i32) {
        self.state.lock().fail_next = Some(errno);
    }

    /// Fail the next `close` with the given errno.
    pub fn fail_close(&self, errno: i32) {
        self.state.lock().fail_close = Some(errno);
    }

    /// All accesses so far, in order.
    pub fn log(&self) -> Vec<Access> {
        self.state.lock().log.clone()
    }

    /// Values written to `address`, in order.
    pub fn writes_to(&self, address: RegisterAddress) -> Vec<u32> {
        self.state
            .lock()
            .log
            .iter()
            .filter_map(|access| match *access {
                Access::Write { address: a, value } if a == address => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Every write as `(address, value)`, in order.
    pub fn writes(&self) -> Vec<(RegisterAddress, u32)> {
        self.state
            .lock()
            .log
            .iter()
            .filter_map(|access| match *access {
                Access::Write { address, value } => Some((address, value)),
                Access::Read { .. } => None,
            })
            .collect()
    }

    /// Number of reads of `address`.
    pub fn read_count(&self, address: RegisterAddress) -> usize {
        self.state
            .lock()
            .log
            .iter()
            .filter(|access| matches!(access, Access::Read { address: a, .. } if *a == address))
            .count()
    }

    /// Forget the access log, keeping register contents.
    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }

    /// Whether `close` has succeeded.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Reopen a closed register file, keeping register contents.
    pub fn reopen(&self) {
        self.state.lock().closed = false;
    }

    fn check(state: &mut MockState, request: u32) -> Result<()> {
        if state.closed {
            return Err(IdmfError::TransportClosed);
        }
        if let Some(errno) = state.fail_next.take() {
            return Err(IdmfError::Transport { request, errno });
        }
        Ok(())
    }
}

impl RegisterTransport for MockTransport {
    fn read_register(&mut self, address: RegisterAddress) -> Result<u32> {
        let request = address.request(RequestDirection::READ)?;
        let mut state = self.state.lock();
        Self::check(&mut state, request)?;

        let queued = state
            .queued
            .get_mut(&address)
            .and_then(|queue| queue.pop_front());
        let value = match queued {
            Some(value) => value,
            None => state.registers.get(&address).copied().unwrap_or(0),
        };

        state.log.push(Access::Read { address, value });
        Ok(value)
    }

    fn write_register(&mut self, address: RegisterAddress, value: u32) -> Result<()> {
        let request = address.request(RequestDirection::WRITE)?;
        let mut state = self.state.lock();
        Self::check(&mut state, request)?;

        state.registers.insert(address, value);
        state.log.push(Access::Write { address, value });
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(IdmfError::TransportClosed);
        }
        if let Some(errno) = state.fail_close.take() {
            return Err(IdmfError::CloseFailed {
                path: "mock".to_string(),
                errno,
            });
        }
        state.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_file() {
        let mock = MockTransport::new();
        let mut transport = mock.clone();

        transport
            .write_register(RegisterAddress::BCT_LED, 1)
            .unwrap();
        assert_eq!(transport.read_register(RegisterAddress::BCT_LED).unwrap(), 1);
        assert_eq!(mock.register(RegisterAddress::BCT_LED), 1);
        assert_eq!(
            mock.log(),
            vec![
                Access::Write {
                    address: RegisterAddress::BCT_LED,
                    value: 1
                },
                Access::Read {
                    address: RegisterAddress::BCT_LED,
                    value: 1
                },
            ]
        );
    }

    #[test]
    fn test_queued_reads_take_precedence() {
        let mut mock = MockTransport::new();
        mock.set_register(RegisterAddress::ADC_DATA, 99);
        mock.queue_reads(RegisterAddress::ADC_DATA, [1, 2]);

        assert_eq!(mock.read_register(RegisterAddress::ADC_DATA).unwrap(), 1);
        assert_eq!(mock.read_register(RegisterAddress::ADC_DATA).unwrap(), 2);
        assert_eq!(mock.read_register(RegisterAddress::ADC_DATA).unwrap(), 99);
        assert_eq!(mock.read_count(RegisterAddress::ADC_DATA), 3);
    }

    #[test]
    fn test_injected_failure() {
        let mut mock = MockTransport::new();
        mock.fail_next(-5);

        let err = mock.read_register(RegisterAddress::GPIO_IN).unwrap_err();
        assert!(matches!(
            err,
            IdmfError::Transport {
                request: 0x2000_0210,
                errno: -5
            }
        ));
        assert!(mock.log().is_empty());
        assert!(mock.read_register(RegisterAddress::GPIO_IN).is_ok());
    }

    #[test]
    fn test_close() {
        let mut mock = MockTransport::new();
        mock.close().unwrap();
        assert!(mock.is_closed());
        assert!(matches!(
            mock.write_register(RegisterAddress::BCT_LED, 0),
            Err(IdmfError::TransportClosed)
        ));
        assert!(matches!(mock.close(), Err(IdmfError::TransportClosed)));

        mock.reopen();
        assert!(mock.write_register(RegisterAddress::BCT_LED, 0).is_ok());
    }
}
