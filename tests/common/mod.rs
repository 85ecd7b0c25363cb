//! Shared helpers for the mock-backed integration tests.

#![allow(dead_code)] // Utilities may not all be used in every test file

use idmf::{Board, MockTransport};

/// Board over a fresh register file, with the open-time writes cleared
/// from the access log.
pub fn mock_board() -> (Board<MockTransport>, MockTransport) {
    let mock = MockTransport::new();
    let board = Board::with_transport("idmf0", mock.clone()).expect("mock board opens");
    mock.clear_log();
    (board, mock)
}
