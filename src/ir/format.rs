pub mod panasonic;

pub use panasonic::Panasonic;

use crate::ir::types::{IrSequence, PulsePair, PulseSymbol};

/// Timing rules of one infrared line protocol.
pub trait IrFormat {
    /// Maps a single captured pair to a symbol. Total: every pair gets one.
    fn classify(pulse: &PulsePair) -> PulseSymbol;
    /// Builds the full transmit waveform for one payload frame.
    fn encode<T: AsRef<[u8]>>(bytes: T) -> IrSequence;
}
