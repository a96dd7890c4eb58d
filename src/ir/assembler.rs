use crate::ir::types::{FrameBytes, FrameError, PulseSymbol, FRAME_CAPACITY};

/// Accumulates classified symbols into frame bytes.
///
/// Only pulse timing and bit/byte counts are looked at here; the byte content
/// is the frame codec's business. A `Header` always resynchronizes, so any
/// error costs at most the frame it happened in.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    in_frame: bool,
    bit_count: u8,
    current_byte: u8,
    buffer: FrameBytes,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_frame(&self) -> bool {
        self.in_frame
    }

    /// Feeds one symbol.
    ///
    /// Returns `None` while a frame is still being assembled (or the line is idle),
    /// `Some(Ok(bytes))` once an `End` closes a byte-aligned frame, and
    /// `Some(Err(_))` when the current frame has to be thrown away.
    pub fn push(&mut self, symbol: PulseSymbol) -> Option<Result<FrameBytes, FrameError>> {
        match symbol {
            PulseSymbol::Header => {
                self.reset();
                self.in_frame = true;
                None
            }
            PulseSymbol::Invalid => {
                self.reset();
                Some(Err(FrameError::InvalidSymbol))
            }
            PulseSymbol::End => {
                let idle = !self.in_frame && self.buffer.is_empty() && self.bit_count == 0;
                let bits = self.bit_count;
                let bytes = core::mem::take(&mut self.buffer);
                self.reset();

                if idle {
                    None
                } else if bits != 0 {
                    Some(Err(FrameError::IncompleteByte { bits }))
                } else {
                    Some(Ok(bytes))
                }
            }
            PulseSymbol::Bit0 | PulseSymbol::Bit1 if self.in_frame => {
                self.current_byte >>= 1;
                if symbol == PulseSymbol::Bit1 {
                    self.current_byte |= 0x80;
                }
                self.bit_count += 1;

                if self.bit_count < 8 {
                    return None;
                }
                self.bit_count = 0;

                if self.buffer.push(self.current_byte).is_err() {
                    self.reset();
                    return Some(Err(FrameError::Overflow {
                        capacity: FRAME_CAPACITY,
                    }));
                }
                None
            }
            PulseSymbol::Bit0 | PulseSymbol::Bit1 => {
                // bits outside a frame are line noise
                None
            }
        }
    }

    fn reset(&mut self) {
        self.in_frame = false;
        self.bit_count = 0;
        self.current_byte = 0;
        self.buffer.clear();
    }
}
