//! Encoder counters, decoder modes and the status LED.

mod common;

use common::mock_board;
use idmf::{EncoderMode, IdmfError, RegisterAddress};

#[test]
fn test_encoder_mode_control_words() {
    let (board, mock) = mock_board();

    board.encoder().configure_raw(0, 1);
    board.encoder().configure_raw(3, 2);
    board.encoder().configure_raw(7, 4);

    assert_eq!(
        mock.writes(),
        vec![
            (RegisterAddress::new(0x318), 0x0002_0080),
            (RegisterAddress::new(0x318 + 3 * 0x40), 0x0006_0090),
            (RegisterAddress::new(0x318 + 7 * 0x40), 0x0006_9096),
        ]
    );
}

#[test]
fn test_encoder_unknown_mode_writes_nothing() {
    let (board, mock) = mock_board();

    for mode in [0, 3, 5, 8, -1] {
        board.encoder().configure_raw(2, mode);
    }
    assert!(mock.log().is_empty());

    let err = board.encoder().try_configure_raw(2, 3).unwrap_err();
    assert!(matches!(err, IdmfError::InvalidEncoderMode { mode: 3 }));
    assert!(mock.log().is_empty());
}

#[test]
fn test_encoder_typed_mode_matches_raw() {
    let (board, mock) = mock_board();

    board.encoder().configure(5, EncoderMode::X4);
    board.encoder().configure_raw(5, 4);

    let words = mock.writes_to(RegisterAddress::encoder_control(5));
    assert_eq!(words, vec![0x0006_9096, 0x0006_9096]);
}

#[test]
fn test_encoder_count_is_signed() {
    let (board, mock) = mock_board();

    board.encoder().write(1, -42);
    assert_eq!(
        mock.register(RegisterAddress::new(0x308 + 0x40)),
        (-42i32) as u32
    );
    assert_eq!(board.encoder().read(1), -42);

    mock.set_register(RegisterAddress::encoder_count(6), 0x8000_0000);
    assert_eq!(board.encoder().read(6), i32::MIN);
}

#[test]
fn test_encoder_reset() {
    let (board, mock) = mock_board();
    mock.set_register(RegisterAddress::encoder_count(4), 1000);

    board.encoder().reset(4);

    assert_eq!(board.encoder().read(4), 0);
    assert_eq!(mock.writes_to(RegisterAddress::encoder_count(4)), vec![0]);
}

#[test]
fn test_led_normalises_nonzero() {
    let (board, mock) = mock_board();

    board.led().write(7);
    assert_eq!(mock.register(RegisterAddress::BCT_LED), 1);
    assert_eq!(board.led().read(), 1);

    board.led().write(0);
    assert_eq!(mock.register(RegisterAddress::BCT_LED), 0);

    board.led().write(u32::MAX);
    assert_eq!(mock.writes_to(RegisterAddress::BCT_LED), vec![1, 0, 1]);
}

#[test]
fn test_led_toggle() {
    let (board, mock) = mock_board();

    assert!(board.led().toggle());
    assert!(!board.led().toggle());
    assert!(board.led().toggle());

    assert_eq!(mock.writes_to(RegisterAddress::BCT_LED), vec![1, 0, 1]);
}
