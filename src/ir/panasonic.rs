pub mod frame;
pub mod types;

pub use frame::{decode, encode, encode_into, DecodeError, DecodedFrame, EncodeError};
pub use types::{AcState, Command, Fan, Field, Mode, ShortCommand, Swing};
