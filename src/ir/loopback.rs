use std::sync::mpsc;
use std::time::Duration;

use crate::ir::input::{self, IrInError, PulseSource};
use crate::ir::output::{self, IrOutError, PulseSink};
use crate::ir::types::{IrSequence, PulsePair};

/// A sink/source pair wired to each other, for running without IR hardware.
///
/// Every transmitted sequence comes back out of the source as one burst.
pub fn loopback() -> (LoopbackSink, LoopbackSource) {
    let (sender, receiver) = mpsc::channel();
    (LoopbackSink { sender }, LoopbackSource { receiver })
}

pub struct LoopbackSink {
    sender: mpsc::Sender<Vec<PulsePair>>,
}

impl PulseSink for LoopbackSink {
    fn transmit(&mut self, pulses: &IrSequence) -> output::Result<()> {
        self.sender
            .send(pulses.as_ref().to_vec())
            .map_err(|_| IrOutError::Send)
    }
}

pub struct LoopbackSource {
    receiver: mpsc::Receiver<Vec<PulsePair>>,
}

impl PulseSource for LoopbackSource {
    fn receive_next(&mut self, timeout: Duration) -> input::Result<Option<Vec<PulsePair>>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(pulses) => Ok(Some(pulses)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(IrInError::Disconnected),
        }
    }
}
