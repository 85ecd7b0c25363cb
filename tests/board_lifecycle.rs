//! Board open/close behaviour and the permissive bounds contract.

mod common;

use common::mock_board;
use idmf::{Board, BoardState, IdmfError, MockTransport, RegisterAddress, ALL_CHANNELS};

#[test]
fn test_open_initialises_board() {
    let mock = MockTransport::new();
    // Leftover state from a previous session must not leak into the cache.
    mock.set_register(RegisterAddress::BCT_PWR, 0x3);
    mock.set_register(RegisterAddress::GPIO_OUT, 0xFFFF);

    let board = Board::with_transport("idmf0", mock.clone()).unwrap();

    assert_eq!(
        mock.writes(),
        vec![
            (RegisterAddress::BCT_PWR, 0),
            (RegisterAddress::ENC_PWRCTRL, 0xFF),
        ]
    );
    assert_eq!(board.state(), BoardState::default());
}

#[test]
fn test_reopen_yields_fresh_cache() {
    let mock = MockTransport::new();
    let board = Board::with_transport("idmf0", mock.clone()).unwrap();

    board.port().write(0, ALL_CHANNELS, 0xAA);
    board.port().write(2, 3, 1);
    board.gpio().write(ALL_CHANNELS, 0x00F0_0F);
    mock.queue_reads(RegisterAddress::ADC_DATA, 1..=8);
    board.adc().update();
    assert_ne!(board.state(), BoardState::default());

    board.close().unwrap();
    assert!(mock.is_closed());

    mock.reopen();
    let board = Board::with_transport("idmf0", mock.clone()).unwrap();
    assert_eq!(board.state(), BoardState::default());
    assert_eq!(board.port().latch(0), 0);
    assert_eq!(board.gpio().latch(), 0);
    assert_eq!(board.adc().samples(), [0; 8]);
}

#[test]
fn test_open_missing_device_fails() {
    let err = Board::open("/nonexistent/idmf42").unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {}", err);
}

#[test]
fn test_out_of_range_reads_return_zero() {
    let (board, mock) = mock_board();
    // Give every register something nonzero to prove nothing is read.
    for offset in (0..0x400).step_by(4) {
        mock.set_register(RegisterAddress::new(offset), 0xFFFF_FFFF);
    }

    for ch in [-1, 8, 100, i32::MIN, i32::MAX] {
        assert_eq!(board.dac().read(ch), 0);
        assert_eq!(board.adc().read(ch), 0);
        assert_eq!(board.encoder().read(ch), 0);
    }
    for port in [-1, 3, 50] {
        assert_eq!(board.port().read(port, ALL_CHANNELS), 0);
        assert_eq!(board.port().read(port, 0), 0);
    }
    for ch in [-2, 8, 9] {
        assert_eq!(board.port().read(0, ch), 0);
    }
    for ch in [-2, 24, 32] {
        assert_eq!(board.gpio().read(ch), 0);
    }

    assert!(mock.log().is_empty());
}

#[test]
fn test_out_of_range_writes_leave_state_unchanged() {
    let (board, mock) = mock_board();
    board.port().write(1, ALL_CHANNELS, 0x5A);
    board.gpio().write(ALL_CHANNELS, 0x12_3456);
    mock.clear_log();
    let before = board.state();

    for ch in [-1, 8, 1000] {
        board.dac().write(ch, 123);
        board.encoder().write(ch, 99);
        board.encoder().configure_raw(ch, 4);
    }
    for port in [-1, 3] {
        board.port().write(port, ALL_CHANNELS, 0xFF);
        board.port().write(port, 0, 1);
    }
    for ch in [-2, 8] {
        board.port().write(1, ch, 1);
    }
    for ch in [-2, 24, 31] {
        board.gpio().write(ch, 1);
    }

    assert_eq!(board.state(), before);
    assert!(mock.log().is_empty());
}

#[test]
fn test_strict_api_reports_out_of_range() {
    let (board, _mock) = mock_board();

    let err = board.dac().try_write(8, 1).unwrap_err();
    assert!(matches!(
        err,
        IdmfError::ChannelOutOfRange {
            group: "DAC",
            channel: 8,
            max: 8
        }
    ));
    assert!(board.adc().try_read(-1).unwrap_err().is_out_of_range());
    assert!(board.port().try_read(3, 0).unwrap_err().is_out_of_range());
    assert!(board.port().try_write(0, 8, 1).unwrap_err().is_out_of_range());
    assert!(board.gpio().try_read(24).unwrap_err().is_out_of_range());
    assert!(board.encoder().try_read(8).unwrap_err().is_out_of_range());
}

#[test]
fn test_strict_api_reports_transport_failure() {
    let (board, mock) = mock_board();

    mock.fail_next(-22);
    let err = board.led().try_write(1).unwrap_err();
    assert!(matches!(
        err,
        IdmfError::Transport {
            request: 0x1000_0200,
            errno: -22
        }
    ));

    mock.fail_next(-5);
    let err = board.gpio().try_read(ALL_CHANNELS).unwrap_err();
    assert!(matches!(
        err,
        IdmfError::Transport {
            request: 0x2000_0210,
            errno: -5
        }
    ));
}

#[test]
fn test_close_failure_is_reported() {
    let mock = MockTransport::new();
    let board = Board::with_transport("idmf0", mock.clone()).unwrap();
    mock.fail_close(-5);

    let err = board.close().unwrap_err();
    assert!(matches!(err, IdmfError::CloseFailed { errno: -5, .. }));
}

#[test]
fn test_board_shared_across_threads() {
    let (board, mock) = mock_board();

    std::thread::scope(|s| {
        for port in 0..3 {
            let board = &board;
            s.spawn(move || {
                for bit in 0..8 {
                    board.port().write(port, bit, 1);
                }
            });
        }
    });

    for port in 0..3 {
        assert_eq!(board.port().latch(port), 0xFF);
        assert_eq!(mock.register(RegisterAddress::port_value(port as usize)), 0xFF);
    }
}
