//! Board status LED.

use crate::device::Board;
use crate::error::Result;
use crate::registers::RegisterAddress;
use crate::subsystem::permissive;
use crate::transport::RegisterTransport;

const GROUP: &str = "LED";

/// Status LED accessor.
pub struct Led<'a, T: RegisterTransport> {
    board: &'a Board<T>,
}

impl<'a, T: RegisterTransport> Led<'a, T> {
    pub(crate) fn new(board: &'a Board<T>) -> Self {
        Self { board }
    }

    /// Switch the LED; any nonzero value turns it on.
    pub fn write(&self, value: u32) {
        permissive(GROUP, self.try_write(value))
    }

    /// Raw LED register.
    pub fn read(&self) -> u32 {
        permissive(GROUP, self.try_read())
    }

    /// Switch the LED on or off.
    pub fn set(&self, on: bool) {
        self.write(u32::from(on))
    }

    /// Invert the LED and return the new state.
    pub fn toggle(&self) -> bool {
        let on = self.read() == 0;
        self.set(on);
        on
    }

    /// Strict [`write`](Self::write).
    pub fn try_write(&self, value: u32) -> Result<()> {
        let value = u32::from(value != 0);
        self.board
            .with_inner(|inner| inner.write(RegisterAddress::BCT_LED, value))
    }

    /// Strict [`read`](Self::read).
    pub fn try_read(&self) -> Result<u32> {
        self.board
            .with_inner(|inner| inner.read(RegisterAddress::BCT_LED))
    }
}

#[cfg(test)]
mod tests {
    use crate::mock::MockTransport;
    use crate::registers::RegisterAddress;
    use crate::Board;

    #[test]
    fn test_toggle() {
        let mock = MockTransport::new();
        let board = Board::with_transport("idmf0", mock.clone()).unwrap();

        assert!(board.led().toggle());
        assert_eq!(mock.register(RegisterAddress::BCT_LED), 1);
        assert!(!board.led().toggle());
        assert_eq!(mock.register(RegisterAddress::BCT_LED), 0);
    }
}
