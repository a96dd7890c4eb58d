use std::convert::TryFrom;

use thiserror::Error;

use crate::ir::panasonic::types::{
    AcState, Command, Fan, Field, InvalidCode, Mode, ShortCommand, Swing, MAX_TEMPERATURE,
    TIMER_MAX,
};
use crate::ir::types::{FrameBytes, FRAME_CAPACITY};

pub const HEADER: [u8; 4] = [0x02, 0x20, 0xE0, 0x04];
pub const SHORT_FRAME_LEN: usize = 8;
pub const STATE_FRAME_LEN: usize = 19;

const SHORT_FLAG: u8 = 0x80;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    #[error("Invalid frame length {0}")]
    InvalidLength(usize),
    #[error("Invalid checksum {actual:#04x}, expected {expected:#04x}")]
    InvalidChecksum { expected: u8, actual: u8 },
    #[error("Invalid frame header")]
    InvalidHeader,
    #[error("Unknown command {0:#06x}")]
    UnknownCommand(u16),
    #[error(transparent)]
    InvalidField(#[from] InvalidCode),
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum EncodeError {
    #[error("Buffer too small, needed {needed} bytes but only {available} available")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("Value {value} out of range for {field}")]
    FieldOutOfRange { field: Field, value: u16 },
}

/// Result of decoding one complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFrame {
    /// Bare 8-byte header frame that carries no command.
    HeaderProbe,
    Command(Command),
}

pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

pub fn frame_len(command: &Command) -> usize {
    match command {
        Command::State(_) => STATE_FRAME_LEN,
        Command::Short(_) => SHORT_FRAME_LEN,
    }
}

pub fn decode(bytes: &[u8]) -> Result<DecodedFrame, DecodeError> {
    let len = bytes.len();
    if len != SHORT_FRAME_LEN && len != STATE_FRAME_LEN {
        return Err(DecodeError::InvalidLength(len));
    }

    let expected = checksum(&bytes[..len - 1]);
    if expected != bytes[len - 1] {
        return Err(DecodeError::InvalidChecksum {
            expected,
            actual: bytes[len - 1],
        });
    }

    if bytes[..HEADER.len()] != HEADER {
        return Err(DecodeError::InvalidHeader);
    }

    if len == SHORT_FRAME_LEN {
        if bytes[4] & SHORT_FLAG == 0 {
            return Ok(DecodedFrame::HeaderProbe);
        }
        let code = u16::from_le_bytes([bytes[5], bytes[6]]);
        return ShortCommand::try_from(code)
            .map(|c| DecodedFrame::Command(Command::Short(c)))
            .map_err(DecodeError::UnknownCommand);
    }

    decode_state(bytes).map(|s| DecodedFrame::Command(Command::State(s)))
}

fn decode_state(bytes: &[u8]) -> Result<AcState, DecodeError> {
    let mode = Mode::try_from(bytes[5] >> 4)?;
    let swing = Swing::try_from(bytes[8] & 0x0F)?;
    let fan = Fan::try_from(bytes[8] >> 4)?;

    Ok(AcState {
        power: bytes[5] & 0x01 != 0,
        mode,
        swing,
        fan,
        temperature: (bytes[6] >> 1) & 0x1F,
        on_timer: bytes[5] & 0x02 != 0,
        off_timer: bytes[5] & 0x04 != 0,
        on_time: bytes[10] as u16 | ((bytes[11] & 0x07) as u16) << 8,
        off_time: (bytes[11] >> 4) as u16 | ((bytes[12] & 0x7F) as u16) << 4,
        time: u16::from_le_bytes([bytes[16], bytes[17]]),
        no_time: bytes[15] & 0x01 != 0,
    })
}

/// Writes the frame for `command` into `out` and returns its length.
///
/// Nothing is written unless the whole frame fits and every field is in range.
pub fn encode_into(command: &Command, out: &mut [u8]) -> Result<usize, EncodeError> {
    let needed = frame_len(command);
    if out.len() < needed {
        return Err(EncodeError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }

    match command {
        Command::Short(short) => {
            out[..HEADER.len()].copy_from_slice(&HEADER);
            out[4] = SHORT_FLAG;
            out[5..7].copy_from_slice(&u16::from(*short).to_le_bytes());
            out[7] = checksum(&out[..7]);
        }
        Command::State(state) => {
            let state = state.normalized();
            check_range(Field::Temperature, state.temperature as u16, MAX_TEMPERATURE as u16)?;
            check_range(Field::OnTime, state.on_time, TIMER_MAX)?;
            check_range(Field::OffTime, state.off_time, TIMER_MAX)?;

            out[..HEADER.len()].copy_from_slice(&HEADER);
            out[4] = 0x00;
            out[5] = u8::from(state.mode) << 4
                | 1 << 3
                | (state.off_timer as u8) << 2
                | (state.on_timer as u8) << 1
                | state.power as u8;
            out[6] = state.temperature << 1;
            out[7] = 0x80;
            out[8] = u8::from(state.fan) << 4 | u8::from(state.swing);
            out[9] = 0x00;
            out[10] = (state.on_time & 0xFF) as u8;
            out[11] = ((state.off_time & 0x0F) as u8) << 4 | 1 << 3 | (state.on_time >> 8) as u8;
            out[12] = 0x80 | (state.off_time >> 4) as u8;
            out[13] = 0x00;
            out[14] = 0x00;
            out[15] = 0x80 | state.no_time as u8;
            out[16..18].copy_from_slice(&state.time.to_le_bytes());
            out[18] = checksum(&out[..18]);
        }
    }

    Ok(needed)
}

pub fn encode(command: &Command) -> Result<FrameBytes, EncodeError> {
    let mut buf = [0u8; FRAME_CAPACITY];
    let len = encode_into(command, &mut buf)?;
    FrameBytes::from_slice(&buf[..len]).map_err(|_| EncodeError::BufferTooSmall {
        needed: len,
        available: FRAME_CAPACITY,
    })
}

fn check_range(field: Field, value: u16, max: u16) -> Result<(), EncodeError> {
    if value > max {
        Err(EncodeError::FieldOutOfRange { field, value })
    } else {
        Ok(())
    }
}
