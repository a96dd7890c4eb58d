use std::time::Duration;

use thiserror::Error;

use crate::ir::types::PulsePair;
use crate::GpioError;

pub const IR_INPUT_PIN: u8 = 4;

const DEBOUNCE: Duration = Duration::from_micros(100);

#[derive(Error, Clone, Debug)]
pub enum IrInError {
    #[error(transparent)]
    Gpio(#[from] GpioError),
    #[error("Pulse source disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, IrInError>;

/// Capture side of the IR hardware.
pub trait PulseSource {
    /// Waits up to `timeout` for the next captured burst.
    ///
    /// `Ok(None)` means the line stayed idle for the whole wait, which the
    /// receive loop treats as an inter-frame gap. A burst closes with a pair
    /// whose space is zero once the line has gone idle.
    fn receive_next(&mut self, timeout: Duration) -> Result<Option<Vec<PulsePair>>>;
}

impl<S: PulseSource + ?Sized> PulseSource for Box<S> {
    fn receive_next(&mut self, timeout: Duration) -> Result<Option<Vec<PulsePair>>> {
        (**self).receive_next(timeout)
    }
}

/// Folds glitches shorter than the debounce window into their neighbours.
///
/// A glitch splits one level into three segments, so it is merged together with
/// the segment on either side to keep marks and spaces alternating.
pub fn debounce(durations: &[Duration]) -> Vec<Duration> {
    let mut out: Vec<Duration> = Vec::with_capacity(durations.len());
    let mut merge_next = false;
    let mut skip_next = false;

    for &duration in durations {
        if skip_next {
            skip_next = false;
            continue;
        }
        match out.last_mut() {
            Some(last) if merge_next => {
                *last += duration;
                merge_next = false;
            }
            Some(last) if duration < DEBOUNCE => {
                *last += duration;
                merge_next = true;
            }
            None if duration < DEBOUNCE => {
                // leading glitch, drop it together with the level that follows
                skip_next = true;
            }
            _ => out.push(duration),
        }
    }
    out
}

/// Rounds to a grid that coarsens with length.
pub fn normalize(duration: Duration) -> Duration {
    fn round(i: u128, fac: u128) -> u128 {
        match i % fac {
            rem if rem >= fac / 2 => i + (fac - rem),
            rem => i - rem,
        }
    }
    Duration::from_micros(match duration.as_micros() {
        m if m < 1000 => round(m, 10),
        m if m < 2000 => round(m, 50),
        m => round(m, 200),
    } as u64)
}

/// Pairs alternating mark/space durations. A trailing lone mark gets a zero space.
pub fn pair_up(durations: &[Duration]) -> Vec<PulsePair> {
    durations
        .chunks(2)
        .map(|chunk| {
            let space = chunk.get(1).map_or(0, Duration::as_micros);
            PulsePair::new(chunk[0].as_micros(), space)
        })
        .collect()
}

#[cfg(feature = "rpi")]
pub use gpio::IrIn;

#[cfg(feature = "rpi")]
mod gpio {
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    use rppal::gpio::{Gpio, InputPin, Level, Trigger};

    use super::{debounce, normalize, pair_up, IrInError, PulseSource, Result, IR_INPUT_PIN};
    use crate::ir::types::PulsePair;
    use crate::GpioError;

    /// Demodulating IR receiver on a GPIO pin, timed from edge interrupts.
    pub struct IrIn {
        pin: InputPin,
        number: u8,
        edges: mpsc::Receiver<Instant>,
        idle_threshold: Duration,
    }

    impl IrIn {
        pub fn start(number: u8, idle_threshold: Duration) -> Result<IrIn> {
            let mut pin = Gpio::new()
                .map_err(|_| GpioError::Initialization)?
                .get(number)
                .map_err(|_| GpioError::Pin(number))?
                .into_input();
            let (edge_sender, edges) = mpsc::channel();
            pin.set_async_interrupt(Trigger::Both, move |_: Level| {
                if edge_sender.send(Instant::now()).is_err() {
                    trace!("ir edge receiver closed");
                }
            })
            .map_err(|_| GpioError::Interrupt(number))?;
            Ok(IrIn {
                pin,
                number,
                edges,
                idle_threshold,
            })
        }

        pub fn default_pin(idle_threshold: Duration) -> Result<Self> {
            Self::start(IR_INPUT_PIN, idle_threshold)
        }

        fn next_edge(&self, timeout: Duration) -> Result<Option<Instant>> {
            match self.edges.recv_timeout(timeout) {
                Ok(instant) => Ok(Some(instant)),
                Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
                Err(mpsc::RecvTimeoutError::Disconnected) => Err(IrInError::Disconnected),
            }
        }
    }

    impl PulseSource for IrIn {
        fn receive_next(&mut self, timeout: Duration) -> Result<Option<Vec<PulsePair>>> {
            let mut last = match self.next_edge(timeout)? {
                Some(first) => first,
                None => return Ok(None),
            };

            let mut durations = Vec::new();
            while let Some(edge) = self.next_edge(self.idle_threshold)? {
                durations.push(edge.duration_since(last));
                last = edge;
            }

            let durations: Vec<_> = debounce(&durations).into_iter().map(normalize).collect();
            let pulses = pair_up(&durations);
            trace!("captured {} pulses on pin {}", pulses.len(), self.number);
            Ok(Some(pulses))
        }
    }

    impl Drop for IrIn {
        fn drop(&mut self) {
            if let Err(e) = self.pin.clear_async_interrupt() {
                error!("could not clear ir interrupt handler: {:?}", e);
            }
        }
    }
}
