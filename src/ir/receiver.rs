use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{spawn_blocking, JoinHandle};
use tokio_stream::Stream;

use crate::ir::assembler::FrameAssembler;
use crate::ir::format::{IrFormat, Panasonic};
use crate::ir::input::PulseSource;
use crate::ir::panasonic::{decode, Command, DecodeError, DecodedFrame};
use crate::ir::types::{hex, FrameError, PulsePair, PulseSymbol};

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ReceiveError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Error, Debug, Clone)]
pub enum ReceiverError {
    #[error("Could not wait for ir receiver thread to stop")]
    ThreadWait,
    #[error("Ir receiver stopped, no more events")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ReceiverError>;

/// Classifier, assembler and codec chained together for one receive stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    assembler: FrameAssembler,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_symbol(
        &mut self,
        symbol: PulseSymbol,
    ) -> Option<std::result::Result<DecodedFrame, ReceiveError>> {
        let bytes = match self.assembler.push(symbol)? {
            Ok(bytes) if bytes.is_empty() => {
                trace!("skipping empty frame");
                return None;
            }
            Ok(bytes) => bytes,
            Err(e) => return Some(Err(e.into())),
        };
        info!("RCV {}", hex(&bytes));
        Some(decode(&bytes).map_err(ReceiveError::from))
    }

    pub fn feed(
        &mut self,
        pulse: &PulsePair,
    ) -> Option<std::result::Result<DecodedFrame, ReceiveError>> {
        self.feed_symbol(Panasonic::classify(pulse))
    }

    /// An idle line closes whatever frame is still open.
    pub fn idle(&mut self) -> Option<std::result::Result<DecodedFrame, ReceiveError>> {
        self.feed_symbol(PulseSymbol::End)
    }

    /// Decodes a run of already classified symbols.
    pub fn decode_stream<I: IntoIterator<Item = PulseSymbol>>(
        &mut self,
        symbols: I,
    ) -> Vec<std::result::Result<DecodedFrame, ReceiveError>> {
        symbols
            .into_iter()
            .filter_map(|symbol| self.feed_symbol(symbol))
            .collect()
    }

    pub fn decode_pulses<T: AsRef<[PulsePair]>>(
        &mut self,
        pulses: T,
    ) -> Vec<std::result::Result<DecodedFrame, ReceiveError>> {
        self.decode_stream(pulses.as_ref().iter().map(Panasonic::classify))
    }
}

/// What the receive loop saw, one per completed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveEvent {
    Frame(DecodedFrame),
    Rejected(ReceiveError),
}

/// Background receive loop over a [`PulseSource`].
///
/// Decoded commands go to the callback given at start, every outcome (probes
/// and rejections included) is also published to [`IrReceiver::event_stream`].
/// The callback sees every command; the event stream only the latest outcome.
pub struct IrReceiver {
    read_handle: JoinHandle<()>,
    read_stop_sender: watch::Sender<bool>,
    event_receiver: watch::Receiver<Option<Arc<ReceiveEvent>>>,
}

impl IrReceiver {
    /// Must be called from within a tokio runtime.
    pub fn start<S, F>(mut source: S, wait_timeout: Duration, mut on_command: F) -> IrReceiver
    where
        S: PulseSource + Send + 'static,
        F: FnMut(Command) + Send + 'static,
    {
        let (read_stop_sender, read_stop_receiver) = watch::channel(false);
        let (event_sender, event_receiver) = watch::channel(None);
        let read_handle = spawn_blocking(move || {
            let mut decoder = FrameDecoder::new();
            loop {
                if *read_stop_receiver.borrow() {
                    trace!("stopping ir receiver thread");
                    break;
                }

                let results = match source.receive_next(wait_timeout) {
                    Ok(Some(pulses)) => decoder.decode_pulses(&pulses),
                    Ok(None) => decoder.idle().into_iter().collect(),
                    Err(e) => {
                        error!("ir pulse source failed: {}", e);
                        break;
                    }
                };

                for result in results {
                    let event = match result {
                        Ok(DecodedFrame::Command(command)) => {
                            info!("received {}", command);
                            on_command(command.clone());
                            ReceiveEvent::Frame(DecodedFrame::Command(command))
                        }
                        Ok(DecodedFrame::HeaderProbe) => {
                            debug!("received header probe");
                            ReceiveEvent::Frame(DecodedFrame::HeaderProbe)
                        }
                        Err(e) => {
                            warn!("rejected ir frame: {}", e);
                            ReceiveEvent::Rejected(e)
                        }
                    };
                    if event_sender.send(Some(Arc::new(event))).is_err() {
                        trace!("no receive event listeners");
                    }
                }
            }
        });
        IrReceiver {
            read_handle,
            read_stop_sender,
            event_receiver,
        }
    }

    pub async fn stop(&mut self) -> Result<()> {
        if self.read_stop_sender.send(true).is_err() {
            debug!("ir receiver thread already stopped");
        }
        (&mut self.read_handle)
            .await
            .map_err(|_| ReceiverError::ThreadWait)
    }

    /// Events produced after the stream is created. Ends once the receiver stops.
    ///
    /// Backed by a `watch` channel, so outcomes arriving faster than the stream
    /// is polled coalesce and only the newest is yielded. Use the command
    /// callback when every command matters.
    pub fn event_stream(&self) -> impl Stream<Item = Result<Arc<ReceiveEvent>>> {
        let mut receiver = self.event_receiver.clone();
        try_stream! {
            loop {
                receiver.changed().await.map_err(|_| ReceiverError::Closed)?;
                let event = receiver.borrow().clone();
                if let Some(event) = event {
                    yield event;
                }
            }
        }
    }
}
