use crate::ir::format::IrFormat;
use crate::ir::types::{IrSequence, PulsePair, PulseSymbol};

pub const HEADER_MARK_US: u32 = 3543;
pub const HEADER_SPACE_US: u32 = 1700;
pub const MARK_US: u32 = 400;
pub const BIT_ONE_SPACE_US: u32 = 1340;
pub const BIT_ZERO_SPACE_US: u32 = 470;
/// Gap between the preamble frame and the payload frame.
pub const IDLE_US: u32 = 10400;
pub const BIT_MARGIN_US: u32 = 150;

// A header is a long mark with a shorter space, or a long space after a shorter mark.
const HEADER_MIN_MARK_US: u32 = 2700;
const HEADER_MIN_SPACE_US: u32 = 1600;

/// Fixed frame every transmission opens with; its last byte is its own checksum.
pub const PREAMBLE: [u8; 8] = [0x02, 0x20, 0xE0, 0x04, 0x00, 0x00, 0x00, 0x06];

const LEADER: PulsePair = PulsePair {
    mark: HEADER_MARK_US,
    space: HEADER_SPACE_US,
};

lazy_static! {
    static ref PREAMBLE_PULSES: Vec<PulsePair> = {
        let mut pulses = Vec::with_capacity(2 + PREAMBLE.len() * 8);
        // the line is idle before the first leader, so the opening gap carries no mark
        pulses.push(PulsePair::new(0, IDLE_US));
        pulses.push(LEADER);
        push_bits(&mut pulses, &PREAMBLE);
        pulses
    };
}

fn bit_pulse(one: bool) -> PulsePair {
    if one {
        PulsePair::new(MARK_US, BIT_ONE_SPACE_US)
    } else {
        PulsePair::new(MARK_US, BIT_ZERO_SPACE_US)
    }
}

/// Bytes go out LSB first.
fn push_bits(pulses: &mut Vec<PulsePair>, bytes: &[u8]) {
    for byte in bytes {
        let mut bits = *byte;
        for _ in 0..8 {
            pulses.push(bit_pulse(bits & 1 == 1));
            bits >>= 1;
        }
    }
}

pub struct Panasonic;

impl IrFormat for Panasonic {
    fn classify(pulse: &PulsePair) -> PulseSymbol {
        let PulsePair { mark, space } = *pulse;

        if space == 0 {
            return PulseSymbol::End;
        }

        if (mark > HEADER_MIN_MARK_US && space < mark)
            || (space > HEADER_MIN_SPACE_US && mark < space)
        {
            return PulseSymbol::Header;
        }

        if mark < MARK_US - BIT_MARGIN_US || mark > MARK_US + BIT_MARGIN_US {
            return PulseSymbol::Invalid;
        }

        if space < mark * 2 {
            PulseSymbol::Bit0
        } else {
            PulseSymbol::Bit1
        }
    }

    fn encode<T: AsRef<[u8]>>(bytes: T) -> IrSequence {
        let bytes = bytes.as_ref();
        let mut pulses = Vec::with_capacity(PREAMBLE_PULSES.len() + 3 + bytes.len() * 8);
        pulses.extend_from_slice(&PREAMBLE_PULSES);

        // trailing mark of the preamble, then the inter-frame gap
        pulses.push(PulsePair::new(MARK_US, IDLE_US));
        pulses.push(LEADER);
        push_bits(&mut pulses, bytes);

        // stop mark
        pulses.push(PulsePair::new(MARK_US, 0));
        IrSequence(pulses)
    }
}
