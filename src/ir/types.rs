use itertools::Itertools;
use num_traits::AsPrimitive;
use thiserror::Error;

/// Largest legal frame, in bytes.
pub const FRAME_CAPACITY: usize = 19;

pub type FrameBytes = heapless::Vec<u8, FRAME_CAPACITY>;

/// One mark (carrier on) followed by one space (carrier off), in microseconds.
/// A zero space marks the end of a captured burst.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct PulsePair {
    pub mark: u32,
    pub space: u32,
}

impl PulsePair {
    pub fn new<T: AsPrimitive<u32>>(mark: T, space: T) -> Self {
        PulsePair {
            mark: mark.as_(),
            space: space.as_(),
        }
    }

    pub fn is_end(&self) -> bool {
        self.space == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrSequence(pub Vec<PulsePair>);

impl IrSequence {
    pub fn into_inner(self) -> Vec<PulsePair> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[PulsePair]> for IrSequence {
    fn as_ref(&self) -> &[PulsePair] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum PulseSymbol {
    Header,
    Bit0,
    Bit1,
    End,
    Invalid,
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum FrameError {
    #[error("Pulse timing matched no known symbol")]
    InvalidSymbol,
    #[error("Frame longer than {capacity} bytes")]
    Overflow { capacity: usize },
    #[error("Frame ended after {bits} bits of an incomplete byte")]
    IncompleteByte { bits: u8 },
}

pub fn hex<T: AsRef<[u8]>>(bytes: T) -> String {
    bytes.as_ref().iter().map(|b| format!("{:02x}", b)).join(" ")
}
